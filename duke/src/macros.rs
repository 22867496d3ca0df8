/// Creates a `String`-like name type backed by a `Cow<'static, str>`.
///
/// Most names the rewriter deals with are compile-time literals (`java/util/List`, `requireNonNull`, ...),
/// so [`from_static`] is `const` and doesn't allocate. Names coming from elsewhere go through [`TryFrom`],
/// which calls the `is_valid` check given to the macro.
///
/// The generated type implements [`Borrow<str>`][std::borrow::Borrow], so maps keyed by it can be queried
/// with a plain `&str`.
///
/// [`from_static`]: #method.from_static
macro_rules! make_name {
	(
		$( #[$doc:meta] )*
		$vis:vis $name:ident;
		is_valid($s:ident) = $check:expr;
	) => {
		$( #[$doc] )*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
		$vis struct $name(std::borrow::Cow<'static, str>);

		impl $name {
			#[doc = concat!("Creates a [`", stringify!($name), "`] from a literal without checking it.")]
			pub const fn from_static(s: &'static str) -> $name {
				$name(std::borrow::Cow::Borrowed(s))
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}

			pub fn into_string(self) -> String {
				self.0.into_owned()
			}

			#[doc = concat!("Checks if `", stringify!($s), "` is valid for a [`", stringify!($name), "`].")]
			pub fn check_valid($s: &str) -> anyhow::Result<()> {
				$check
			}

			pub fn is_valid(s: &str) -> bool {
				Self::check_valid(s).is_ok()
			}
		}

		impl std::fmt::Debug for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				std::fmt::Debug::fmt(self.as_str(), f)
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(self.as_str())
			}
		}

		impl TryFrom<String> for $name {
			type Error = anyhow::Error;

			fn try_from(value: String) -> anyhow::Result<$name> {
				use anyhow::Context;
				$name::check_valid(&value)
					.with_context(|| anyhow::anyhow!("on value {value:?}"))?;
				Ok($name(std::borrow::Cow::Owned(value)))
			}
		}

		impl TryFrom<&str> for $name {
			type Error = anyhow::Error;

			fn try_from(value: &str) -> anyhow::Result<$name> {
				$name::try_from(value.to_owned())
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				self.as_str()
			}
		}

		impl std::borrow::Borrow<str> for $name {
			fn borrow(&self) -> &str {
				self.as_str()
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				self.as_str() == other
			}
		}

		impl PartialEq<&str> for $name {
			fn eq(&self, other: &&str) -> bool {
				self.as_str() == *other
			}
		}
	}
}

pub(crate) use make_name;
