//! Derives URL slugs from post titles.

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of whitespace and punctuation that separate the words of a slug.
static DELIMITERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"[\t !"#$%&'()*\-/<=>?@\[\\\]^_`{|},.:]+"##).unwrap()
});

/// Builds a slug from a post title: the title is lower-cased, split on runs of
/// whitespace and punctuation, each word is transliterated to its closest
/// ASCII approximation, and the words are joined with `-`. A delimiter at
/// either end of the title leaves an empty word behind, so `"Hello!"` becomes
/// `hello-`. An empty title yields an empty slug.
pub fn slugify(title: &str) -> String {
    DELIMITERS
        .split(&title.to_lowercase())
        .map(deunicode)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod test {
    use super::*;

    struct TestCase {
        title: &'static str,
        wanted: &'static str,
    }

    #[test]
    fn test_slugify() {
        let test_cases = [
            TestCase {
                title: "Hello, World! Déjà-vu",
                wanted: "hello-world-deja-vu",
            },
            TestCase {
                title: "Simple",
                wanted: "simple",
            },
            TestCase {
                title: "spaced   out\ttitle",
                wanted: "spaced-out-title",
            },
            TestCase {
                title: "  padded title ",
                wanted: "-padded-title-",
            },
            TestCase {
                title: "snake_case & [brackets] {braces}",
                wanted: "snake-case-brackets-braces-",
            },
            TestCase {
                title: "Hello, World!",
                wanted: "hello-world-",
            },
            TestCase {
                title: "(Why?) not",
                wanted: "-why-not",
            },
            TestCase {
                title: "Ça marche à Noël",
                wanted: "ca-marche-a-noel",
            },
            TestCase {
                title: "C++ tips",
                wanted: "c++-tips",
            },
            TestCase {
                title: "",
                wanted: "",
            },
        ];

        for test_case in test_cases.iter() {
            assert_eq!(test_case.wanted, slugify(test_case.title), "{:?}", test_case.title);
        }
    }

    #[test]
    fn test_slugify_is_deterministic() {
        let title = "Straße über Ärger";
        assert_eq!(slugify(title), slugify(title));
        assert!(slugify(title).is_ascii());
    }
}
