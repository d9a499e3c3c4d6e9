pub use eyre::{bail, ensure, eyre, Result, WrapErr};
pub use std::format as f;
pub use std::println as p;

pub trait OptionStringExt<S>
where
    S: AsRef<str>,
{
    fn is_none_or_empty(&self) -> bool;
    fn not_empty(self) -> Option<S>;
}

impl<S> OptionStringExt<S> for Option<S>
where
    S: AsRef<str>,
{
    fn is_none_or_empty(&self) -> bool {
        self.as_ref().map_or(true, |s| s.as_ref().is_empty())
    }

    fn not_empty(self) -> Option<S> {
        self.filter(|x| !x.as_ref().is_empty())
    }
}
