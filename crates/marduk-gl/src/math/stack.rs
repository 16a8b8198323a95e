use crate::RecordError;

use super::Mat4;

/// Selects which stack matrix operations apply to.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum MatrixMode {
    #[default]
    ModelView,
    Projection,
    Texture,
}

impl MatrixMode {
    #[inline]
    const fn index(self) -> usize {
        match self {
            MatrixMode::ModelView => 0,
            MatrixMode::Projection => 1,
            MatrixMode::Texture => 2,
        }
    }
}

/// Bounded matrix stack. Storage is allocated once; `top` indexes the current matrix.
#[derive(Debug, Clone)]
pub(crate) struct MatrixStack {
    mats: Vec<Mat4>,
    top: usize,
}

impl MatrixStack {
    /// Allows `depth` pushes on top of the base identity.
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            mats: vec![Mat4::IDENTITY; depth + 1],
            top: 0,
        }
    }

    #[inline]
    pub(crate) fn top(&self) -> &Mat4 {
        &self.mats[self.top]
    }

    #[inline]
    pub(crate) fn top_mut(&mut self) -> &mut Mat4 {
        &mut self.mats[self.top]
    }

    #[inline]
    pub(crate) fn top_index(&self) -> usize {
        self.top
    }

    pub(crate) fn push(&mut self) -> Result<(), RecordError> {
        if self.top + 1 >= self.mats.len() {
            return Err(RecordError::StackOverflow);
        }
        self.mats[self.top + 1] = self.mats[self.top];
        self.top += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<(), RecordError> {
        if self.top == 0 {
            return Err(RecordError::StackUnderflow);
        }
        self.top -= 1;
        Ok(())
    }
}

/// The model-view, projection and texture stacks plus the selected mode.
#[derive(Debug, Clone)]
pub(crate) struct MatrixStacks {
    stacks: [MatrixStack; 3],
    mode: MatrixMode,
}

impl MatrixStacks {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            stacks: [
                MatrixStack::new(depth),
                MatrixStack::new(depth),
                MatrixStack::new(depth),
            ],
            mode: MatrixMode::default(),
        }
    }

    #[inline]
    pub(crate) fn mode(&self) -> MatrixMode {
        self.mode
    }

    #[inline]
    pub(crate) fn set_mode(&mut self, mode: MatrixMode) {
        self.mode = mode;
    }

    #[inline]
    pub(crate) fn get(&self, mode: MatrixMode) -> &MatrixStack {
        &self.stacks[mode.index()]
    }

    #[inline]
    pub(crate) fn current(&mut self) -> &mut MatrixStack {
        &mut self.stacks[self.mode.index()]
    }

    /// `top' = top * m`: `m` applies to vertices before the existing transform.
    #[inline]
    pub(crate) fn mul_top(&mut self, m: Mat4) {
        let top = self.current().top_mut();
        *top = *top * m;
    }

    /// Model-view-projection snapshot for a uniform block.
    #[inline]
    pub(crate) fn mvp(&self) -> Mat4 {
        *self.get(MatrixMode::Projection).top() * *self.get(MatrixMode::ModelView).top()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_duplicates_top_and_pop_restores() {
        let mut s = MatrixStack::new(4);
        *s.top_mut() = Mat4::translation(1.0, 0.0, 0.0);
        s.push().unwrap();
        assert_eq!(*s.top(), Mat4::translation(1.0, 0.0, 0.0));
        *s.top_mut() = Mat4::scaling(3.0, 3.0, 3.0);
        s.pop().unwrap();
        assert_eq!(*s.top(), Mat4::translation(1.0, 0.0, 0.0));
    }

    #[test]
    fn overflow_after_depth_pushes_leaves_stack_unchanged() {
        let depth = 8;
        let mut s = MatrixStack::new(depth);
        for _ in 0..depth {
            s.push().unwrap();
        }
        *s.top_mut() = Mat4::scaling(2.0, 2.0, 2.0);
        assert_eq!(s.push(), Err(RecordError::StackOverflow));
        assert_eq!(s.top_index(), depth);
        assert_eq!(*s.top(), Mat4::scaling(2.0, 2.0, 2.0));
    }

    #[test]
    fn underflow_at_base_leaves_identity() {
        let mut s = MatrixStack::new(2);
        s.push().unwrap();
        s.pop().unwrap();
        assert_eq!(s.pop(), Err(RecordError::StackUnderflow));
        assert_eq!(s.top_index(), 0);
        assert_eq!(*s.top(), Mat4::IDENTITY);
    }

    #[test]
    fn stacks_are_independent() {
        let mut st = MatrixStacks::new(4);
        st.set_mode(MatrixMode::Projection);
        st.mul_top(Mat4::scaling(2.0, 2.0, 2.0));
        st.current().push().unwrap();
        st.set_mode(MatrixMode::ModelView);
        st.mul_top(Mat4::translation(1.0, 0.0, 0.0));

        assert_eq!(st.get(MatrixMode::Projection).top_index(), 1);
        assert_eq!(st.get(MatrixMode::ModelView).top_index(), 0);
        assert_eq!(*st.get(MatrixMode::Texture).top(), Mat4::IDENTITY);
        assert_eq!(
            st.mvp(),
            Mat4::scaling(2.0, 2.0, 2.0) * Mat4::translation(1.0, 0.0, 0.0)
        );
    }
}
