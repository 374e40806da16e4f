use std::cell::Cell;
use std::rc::Rc;

use kurbo::Affine;

use super::NodeState;

/// A local transform optionally chained to a parent transform.
///
/// Layer parenting builds chains of these; [`Matrix::total`] is the
/// concatenation from the root down to this node.
#[derive(Debug)]
pub struct Matrix {
    state: NodeState,
    parent: Option<Rc<Matrix>>,
    local: Cell<Affine>,
}

impl Matrix {
    pub fn new(parent: Option<Rc<Matrix>>) -> Rc<Self> {
        Rc::new(Self {
            state: NodeState::default(),
            parent,
            local: Cell::new(Affine::IDENTITY),
        })
    }

    pub fn set_local(&self, m: Affine) {
        if self.local.get() != m {
            self.local.set(m);
            self.state.invalidate();
        }
    }

    pub fn local(&self) -> Affine {
        self.local.get()
    }

    pub fn parent(&self) -> Option<&Rc<Matrix>> {
        self.parent.as_ref()
    }

    /// Concatenated transform, computed on demand.
    pub fn total(&self) -> Affine {
        match &self.parent {
            Some(p) => p.total() * self.local.get(),
            None => self.local.get(),
        }
    }

    /// Returns whether the concatenated transform changed this pass.
    pub fn revalidate(&self, pass: u64) -> bool {
        let parent_changed = self.parent.as_ref().is_some_and(|p| p.revalidate(pass));
        self.state.revalidate(pass, |dirty| dirty || parent_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_concatenates_parent_first() {
        let parent = Matrix::new(None);
        parent.set_local(Affine::translate((10.0, 0.0)));
        let child = Matrix::new(Some(parent.clone()));
        child.set_local(Affine::scale(2.0));

        let p = child.total() * kurbo::Point::new(1.0, 1.0);
        assert_eq!(p, kurbo::Point::new(12.0, 2.0));

        assert!(child.revalidate(1));
        assert!(!child.revalidate(2));
        parent.set_local(Affine::translate((20.0, 0.0)));
        assert!(child.revalidate(3));
    }
}
