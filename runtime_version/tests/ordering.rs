use std::cmp::Ordering;
use pretty_assertions::assert_eq;
use runtime_version::Version;

fn v(s: &str) -> Version {
	Version::parse(s).unwrap()
}

#[test]
fn valid() {
	for s in [
		"1",
		"9",
		"11",
		"11.0.1",
		"11.0.0.1",
		"17-ea",
		"17-ea+19",
		"17+0",
		"17.0.2+8",
		"17.0.2+8-LTS",
		"21-internal-adhoc.build.jdk",
		"17+-foo",
		"1.8.0_292-b10",
		"1.8.0_292",
	] {
		assert!(Version::parse(s).is_ok(), "{s:?} is a valid version string");
	}
}

#[test]
fn invalid() {
	for s in [
		"",
		"0",
		"011",
		"11.0",
		"11.01",
		"11.",
		".11",
		"11-",
		"11+",
		"11-ea+",
		"11+05",
		"11-a.b",
		"11--foo",
		"11-ea+-foo",
		"11 ",
		"v11",
		"1.7.0_80",
		"1.8.0_b10",
	] {
		assert!(Version::parse(s).is_err(), "{s:?} is an invalid version string");
	}
}

#[test]
fn standard_order() {
	assert!(v("11") < v("11.0.1"));
	assert!(v("11.0.1") < v("17-ea+19"));
	assert!(v("11") < v("17-ea+19"));

	// shorter but otherwise equal sorts lower
	assert!(v("11.0.1") < v("11.0.1.1"));
	assert!(v("11.0.10") > v("11.0.9"));

	// pre-release: absent sorts higher, numeric sorts lower than non-numeric
	assert!(v("17-ea") < v("17"));
	assert!(v("17-9") < v("17-10"));
	assert!(v("17-10") < v("17-ea"));
	assert!(v("17-alpha") < v("17-beta"));

	// build: absent sorts lower
	assert!(v("17") < v("17+1"));
	assert!(v("17+2") < v("17+10"));
	assert!(v("17-ea+35") < v("17+1"));

	// optional: absent sorts lower
	assert!(v("17+1") < v("17+1-foo"));
	assert!(v("17+1-a") < v("17+1-b"));

	assert!(v("1.8.0_292-b10") < v("9"));
	assert!(v("1.8.0_202") < v("1.8.0_292"));
}

#[test]
fn ignoring_optional() {
	let a = v("17.0.2+8-LTS");
	let b = v("17.0.2+8-internal");
	assert_eq!(a.cmp_ignore_optional(&b), Ordering::Equal);
	assert!(a.eq_ignore_optional(&b));
	assert_ne!(a, b);
	assert_eq!(a.cmp(&b), Ordering::Less);

	assert!(!a.eq_ignore_optional(&v("17.0.2+9-LTS")));
}

#[test]
fn sorting() {
	let mut versions: Vec<Version> = ["17", "11.0.2", "17-ea+19", "11", "1.8.0_292-b10", "17+1", "11.0.2+9"]
		.into_iter()
		.map(v)
		.collect();
	versions.sort();

	let sorted: Vec<String> = versions.iter().map(ToString::to_string).collect();
	assert_eq!(sorted, vec!["1.8+292-b10", "11", "11.0.2", "11.0.2+9", "17-ea+19", "17", "17+1"]);
}

#[test]
fn from_str() {
	let parsed: Version = "11.0.2+9".parse().unwrap();
	assert_eq!(parsed, v("11.0.2+9"));
	assert_eq!(parsed.build(), Some(9));
}
