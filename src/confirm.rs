// Confirmation providers for destructive store operations

/// Prompt shown before clearing a non-empty list
pub const CLEAR_ALL_PROMPT: &str = "Are you sure you want to delete all tasks? This action cannot be undone.";

/// Blocking yes/no decision, injected into the store
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<C: Confirm + ?Sized> Confirm for Box<C> {
    fn confirm(&mut self, prompt: &str) -> bool {
        (**self).confirm(prompt)
    }
}

/// Confirmation backed by a closure, see [`from_fn`]
pub struct FromFn<F>(F);

/// Answer prompts with `f`
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(&str) -> bool,
{
    FromFn(f)
}

impl<F> Confirm for FromFn<F>
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        (self.0)(prompt)
    }
}

/// Always answers with the same decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Always(pub bool);

impl Always {
    pub fn yes() -> Self {
        Always(true)
    }

    pub fn no() -> Self {
        Always(false)
    }
}

impl Confirm for Always {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}
