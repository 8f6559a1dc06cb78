//! Arena of lexical scopes.
//!
//! Scopes are addressed by [`ScopeId`] and link to their enclosing
//! scope by id. A scope is released when the activation that created
//! it ends. Scopes a function value captured outlive their activation
//! until [`Scopes::collect`] finds no path to them.

use indexmap::IndexMap;

use crate::value::Value;

/// Fewest retained scopes that trigger a collection.
const MIN_COLLECT_THRESHOLD: usize = 64;

/// Index of a scope in a [`Scopes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    bindings: IndexMap<String, Value>,
    parent: Option<ScopeId>,
    /// Opened and not yet released.
    active: bool,
    /// Reachable from some function value.
    captured: bool,
    /// On the free list.
    vacant: bool,
}

/// Scope chain storage for one evaluation.
#[derive(Debug)]
pub struct Scopes {
    slots: Vec<Scope>,
    free: Vec<usize>,
    /// Captured scopes released since the last collection.
    retained: usize,
    threshold: usize,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    /// Create an arena holding only the global scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Scope {
                active: true,
                captured: true,
                ..Scope::default()
            }],
            free: Vec::new(),
            retained: 0,
            threshold: MIN_COLLECT_THRESHOLD,
        }
    }

    /// The root of every scope chain.
    #[must_use]
    pub const fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a child scope of `parent`.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let scope = Scope {
            parent: Some(parent),
            active: true,
            ..Scope::default()
        };
        if let Some(index) = self.free.pop() {
            self.slots[index] = scope;
            ScopeId(index)
        } else {
            self.slots.push(scope);
            ScopeId(self.slots.len() - 1)
        }
    }

    /// End the activation that opened `id`.
    ///
    /// The slot is reused at once unless the scope was captured; a
    /// captured scope waits for the next [`Scopes::collect`].
    pub fn release(&mut self, id: ScopeId) {
        if id == self.global() {
            return;
        }
        let scope = &mut self.slots[id.0];
        scope.active = false;
        if scope.captured {
            self.retained += 1;
        } else {
            self.vacate(id.0);
        }
    }

    /// Mark `id` and its ancestors as reachable from a function value.
    pub fn capture(&mut self, id: ScopeId) {
        let mut current = Some(id);
        while let Some(ScopeId(index)) = current {
            let scope = &mut self.slots[index];
            if scope.captured {
                break;
            }
            scope.captured = true;
            current = scope.parent;
        }
    }

    /// Whether enough captured scopes have been released since the
    /// last collection to make another one worthwhile.
    #[must_use]
    pub const fn should_collect(&self) -> bool {
        self.retained >= self.threshold
    }

    /// Free every released scope that is no longer reachable.
    ///
    /// Reachability starts from active scopes and `roots` and follows
    /// parent links plus, for each bound value, the scope `captured_by`
    /// maps it to. Returns the number of scopes freed.
    pub fn collect<F>(&mut self, roots: &[ScopeId], captured_by: F) -> usize
    where
        F: Fn(&Value) -> Option<ScopeId>,
    {
        let mut marked = vec![false; self.slots.len()];
        let mut pending: Vec<ScopeId> = roots.to_vec();
        pending.extend(
            self.slots
                .iter()
                .enumerate()
                .filter(|(_, scope)| scope.active)
                .map(|(index, _)| ScopeId(index)),
        );

        while let Some(ScopeId(index)) = pending.pop() {
            if marked[index] || self.slots[index].vacant {
                continue;
            }
            marked[index] = true;
            let scope = &self.slots[index];
            pending.extend(scope.parent);
            pending.extend(scope.bindings.values().filter_map(&captured_by));
        }

        let mut freed = 0;
        for (index, reachable) in marked.into_iter().enumerate() {
            let scope = &self.slots[index];
            if !reachable && !scope.vacant && !scope.active {
                self.vacate(index);
                freed += 1;
            }
        }

        self.retained = 0;
        self.threshold = self.live().max(MIN_COLLECT_THRESHOLD);
        freed
    }

    fn vacate(&mut self, index: usize) {
        let scope = &mut self.slots[index];
        scope.bindings.clear();
        scope.parent = None;
        scope.captured = false;
        scope.vacant = true;
        self.free.push(index);
    }

    /// Look `name` up from `scope` outward.
    #[must_use]
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        let mut current = Some(scope);
        while let Some(ScopeId(index)) = current {
            let scope = &self.slots[index];
            if let Some(value) = scope.bindings.get(name) {
                return Some(value);
            }
            current = scope.parent;
        }
        None
    }

    /// Bind `name` in `scope` itself, shadowing any outer binding.
    pub fn declare(&mut self, scope: ScopeId, name: &str, value: Value) {
        self.slots[scope.0].bindings.insert(name.to_string(), value);
    }

    /// Update the nearest binding of `name` visible from `scope`, or
    /// declare it in `scope` when no enclosing scope defines it.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) {
        let mut current = Some(scope);
        while let Some(ScopeId(index)) = current {
            let slot = &mut self.slots[index];
            if let Some(existing) = slot.bindings.get_mut(name) {
                *existing = value;
                return;
            }
            current = slot.parent;
        }
        self.declare(scope, name, value);
    }

    /// Number of scopes on the chain from `scope` to the global scope,
    /// inclusive.
    #[must_use]
    pub fn depth(&self, scope: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = Some(scope);
        while let Some(ScopeId(index)) = current {
            depth += 1;
            current = self.slots[index].parent;
        }
        depth
    }

    /// Scopes currently allocated, including released captured ones
    /// not yet collected.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Every value bound in an allocated scope.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.slots
            .iter()
            .filter(|scope| !scope.vacant)
            .flat_map(|scope| scope.bindings.values())
    }

    /// Bindings of `scope` itself in declaration order.
    pub fn bindings(&self, scope: ScopeId) -> impl Iterator<Item = (&str, &Value)> {
        self.slots[scope.0]
            .bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}
