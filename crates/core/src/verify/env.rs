use crate::types::VuType;

/// A local binding introduced by an assignment or a `for` target.
#[derive(Debug, Clone)]
pub(super) struct Binding {
    pub(super) name: String,
    pub(super) ty: VuType,
    pub(super) loop_var: bool,
}

/// Scoped variable environment. The innermost scope is last.
#[derive(Debug, Default)]
pub(super) struct Env {
    scopes: Vec<Vec<Binding>>,
}

impl Env {
    pub(super) fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
        }
    }

    pub(super) fn push(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub(super) fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub(super) fn bind(&mut self, name: impl Into<String>, ty: VuType, loop_var: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Binding {
                name: name.into(),
                ty,
                loop_var,
            });
        }
    }

    /// Innermost binding of `name` in any enclosing scope.
    pub(super) fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|b| b.name == name)
    }

    pub(super) fn is_loop_var(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|b| b.loop_var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_scoped() {
        let mut env = Env::new();
        env.bind("a", VuType::bool(), false);
        env.push();
        env.bind("e", VuType::num(), true);
        assert!(env.lookup("a").is_some());
        assert!(env.is_loop_var("e"));
        env.pop();
        assert!(env.lookup("e").is_none());
        assert!(!env.is_loop_var("a"));
    }

    #[test]
    fn outermost_scope_is_never_popped() {
        let mut env = Env::new();
        env.pop();
        env.bind("a", VuType::bool(), false);
        assert!(env.lookup("a").is_some());
    }
}
