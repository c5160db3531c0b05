use alloc::borrow::Cow;
use core::fmt;

/// A callable value, described by its name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Function {
    name: Option<Cow<'static, str>>,
}

impl Function {
    /// A function with a name.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        Self {
            name: (!name.is_empty()).then_some(name),
        }
    }

    /// A function without a name.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { name: None }
    }

    /// Describes a Rust callable by its type name. Closures are anonymous.
    ///
    /// ```
    /// use blunder::Function;
    ///
    /// fn handle_click() {}
    ///
    /// assert_eq!(Function::of(&handle_click).name(), Some("handle_click"));
    /// assert_eq!(Function::of(&|| ()).name(), None);
    /// ```
    #[must_use]
    pub fn of<F>(_: &F) -> Self {
        match short_type_name(core::any::type_name::<F>()) {
            Some(name) if !name.contains("{{closure}}") => Self::named(name),
            _ => Self::anonymous(),
        }
    }

    /// The name, if there is one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "function {}() {{ [native code] }}",
            self.name.as_deref().unwrap_or_default()
        )
    }
}

/// The last path segment of a type name, ignoring generic arguments.
pub(crate) fn short_type_name(type_name: &'static str) -> Option<&'static str> {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().filter(|segment| !segment.is_empty())
}
