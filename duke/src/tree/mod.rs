pub mod class;
pub mod field;
pub mod method;
pub mod attribute;
pub mod version;
pub mod descriptor;

mod names {
	/// Checks if a class name is valid according to JVMS 4.2.1 (also accepting array class names).
	pub(super) fn is_valid_class_name(x: &str) -> bool {
		if let Some(element) = x.strip_prefix('[') {
			// array class names are field descriptors
			let element = element.trim_start_matches('[');
			x.len() - element.len() <= 255 && crate::tree::descriptor::Type::parse(element).is_ok()
		} else {
			// a list of identifiers split by /
			x.split('/').all(is_valid_unqualified_name)
		}
	}

	/// Checks if a name is an unqualified name according to JVMS 4.2.2
	///
	/// This is used for field names.
	pub(super) fn is_valid_unqualified_name(x: &str) -> bool {
		!x.is_empty() && x.chars().all(|c| !matches!(c, '.' | ';' | '[' | '/'))
	}

	/// Checks if a method name is valid according to JVMS 4.2.2
	pub(super) fn is_valid_method_name(x: &str) -> bool {
		x == "<init>" || x == "<clinit>" || (
			!x.is_empty() &&
				x.chars().all(|c| !matches!(c, '.' | ';' | '[' | '/' | '<' | '>'))
		)
	}

	#[cfg(test)]
	mod testing {
		use crate::tree::names::*;

		#[test]
		fn class_names() {
			assert!(is_valid_class_name("java/lang/Object"));
			assert!(is_valid_class_name("java/lang/Runtime$Version"));
			assert!(is_valid_class_name("[Ljava/lang/Object;"));
			assert!(is_valid_class_name("[[[D"));

			assert!(!is_valid_class_name(""));
			assert!(!is_valid_class_name("/a"));
			assert!(!is_valid_class_name("a//b"));
			assert!(!is_valid_class_name("a.b"));
			assert!(!is_valid_class_name("[V"));
			assert!(!is_valid_class_name("[Ljava/lang/Object"));
		}

		#[test]
		fn method_names() {
			assert!(is_valid_method_name("isBlank"));
			assert!(is_valid_method_name("<init>"));
			assert!(is_valid_method_name("<clinit>"));
			assert!(is_valid_method_name("lambda$main$0"));

			assert!(!is_valid_method_name(""));
			assert!(!is_valid_method_name("<NotClinit>"));
			assert!(!is_valid_method_name("a/b"));
			assert!(!is_valid_unqualified_name("a;b"));
		}
	}
}
