//! Built-in `format` constraints.
//!
//! Each supported format becomes a regex-membership constraint over the
//! string payload plus a length bound appropriate to the format. The shapes
//! deliberately capture the essence of each format rather than the full
//! grammar; both sides of a check use the same shape, which is what
//! subsumption needs. Unknown formats impose no constraint.

use z3::ast::{Ast, Bool, Int, Regexp};

fn digit() -> Regexp {
    Regexp::range('0', '9')
}

fn hex_digit() -> Regexp {
    Regexp::union(&[
        &Regexp::range('0', '9'),
        &Regexp::range('a', 'f'),
        &Regexp::range('A', 'F'),
    ])
}

fn word_char() -> Regexp {
    Regexp::union(&[
        &Regexp::range('a', 'z'),
        &Regexp::range('A', 'Z'),
        &Regexp::range('0', '9'),
        &Regexp::literal("."),
        &Regexp::literal("_"),
        &Regexp::literal("-"),
        &Regexp::literal("%"),
        &Regexp::literal("+"),
    ])
}

fn uri_char() -> Regexp {
    Regexp::union(&[
        &Regexp::range('a', 'z'),
        &Regexp::range('A', 'Z'),
        &Regexp::range('0', '9'),
        &Regexp::literal("."),
        &Regexp::literal("/"),
        &Regexp::literal("-"),
        &Regexp::literal("_"),
    ])
}

fn repeat(unit: &Regexp, times: usize) -> Regexp {
    let copies: Vec<Regexp> = (0..times).map(|_| unit.clone()).collect();
    let refs: Vec<&Regexp> = copies.iter().collect();
    Regexp::concat(&refs)
}

/// Constraint for a named format over `s`, or `None` when the format is
/// unknown (lenient no-op).
pub fn format_constraint(s: &z3::ast::String, name: &str) -> Option<Bool> {
    let length = s.length();
    match name {
        "email" => {
            let pattern = Regexp::concat(&[
                &word_char().plus(),
                &Regexp::literal("@"),
                &word_char().plus(),
            ]);
            Some(Bool::and(&[
                &s.regex_matches(&pattern),
                &length.ge(&Int::from_i64(5)),
            ]))
        }
        "uri" => {
            let http = Regexp::concat(&[
                &Regexp::literal("http"),
                &Regexp::literal("s").option(),
                &Regexp::literal("://"),
                &uri_char().star(),
            ]);
            let ftp = Regexp::concat(&[&Regexp::literal("ftp://"), &uri_char().star()]);
            Some(Bool::or(&[
                &s.regex_matches(&http),
                &s.regex_matches(&ftp),
            ]))
        }
        "uuid" => {
            let hex = hex_digit();
            let dash = Regexp::literal("-");
            let pattern = Regexp::concat(&[
                &repeat(&hex, 8),
                &dash,
                &repeat(&hex, 4),
                &dash,
                &repeat(&hex, 4),
                &dash,
                &repeat(&hex, 4),
                &dash,
                &repeat(&hex, 12),
            ]);
            Some(Bool::and(&[
                &length._eq(&Int::from_i64(36)),
                &s.regex_matches(&pattern),
            ]))
        }
        "date" => {
            let d = digit();
            let dash = Regexp::literal("-");
            let pattern = Regexp::concat(&[
                &repeat(&d, 4),
                &dash,
                &repeat(&d, 2),
                &dash,
                &repeat(&d, 2),
            ]);
            Some(Bool::and(&[
                &length._eq(&Int::from_i64(10)),
                &s.regex_matches(&pattern),
            ]))
        }
        "date-time" => {
            let d = digit();
            let dash = Regexp::literal("-");
            let colon = Regexp::literal(":");
            let pattern = Regexp::concat(&[
                &repeat(&d, 4),
                &dash,
                &repeat(&d, 2),
                &dash,
                &repeat(&d, 2),
                &Regexp::literal("T"),
                &repeat(&d, 2),
                &colon,
                &repeat(&d, 2),
                &colon,
                &repeat(&d, 2),
            ]);
            Some(Bool::and(&[
                &length.ge(&Int::from_i64(19)),
                &s.regex_matches(&Regexp::concat(&[
                    &pattern,
                    &Regexp::range(' ', '~').star(),
                ])),
            ]))
        }
        "time" => {
            let d = digit();
            let colon = Regexp::literal(":");
            let pattern = Regexp::concat(&[
                &repeat(&d, 2),
                &colon,
                &repeat(&d, 2),
                &colon,
                &repeat(&d, 2),
            ]);
            Some(Bool::and(&[
                &length.ge(&Int::from_i64(8)),
                &s.regex_matches(&Regexp::concat(&[
                    &pattern,
                    &Regexp::range(' ', '~').star(),
                ])),
            ]))
        }
        "ipv4" => {
            let d = digit();
            let dot = Regexp::literal(".");
            let octet = d.plus();
            let pattern = Regexp::concat(&[&octet, &dot, &octet, &dot, &octet, &dot, &octet]);
            Some(Bool::and(&[
                &s.regex_matches(&pattern),
                &length.ge(&Int::from_i64(7)),
            ]))
        }
        "ipv6" => {
            let hex = hex_digit();
            let colon = Regexp::literal(":");
            let pattern = Regexp::concat(&[
                &hex.plus(),
                &Regexp::concat(&[&colon, &hex.plus()]).star(),
            ]);
            Some(Bool::and(&[
                &s.regex_matches(&pattern),
                &length.ge(&Int::from_i64(2)),
            ]))
        }
        _ => None,
    }
}

/// True when `name` is one of the formats with a built-in constraint.
pub fn is_builtin_format(name: &str) -> bool {
    matches!(
        name,
        "email" | "uri" | "uuid" | "date" | "date-time" | "time" | "ipv4" | "ipv6"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::{SatResult, Solver};

    fn accepts(format: &str, value: &str) -> bool {
        let solver = Solver::new();
        let s = z3::ast::String::new_const("s");
        solver.assert(&s._eq(&z3::ast::String::from(value)));
        solver.assert(&format_constraint(&s, format).expect("builtin format"));
        solver.check() == SatResult::Sat
    }

    #[test]
    fn email_shape() {
        assert!(accepts("email", "user@example.org"));
        assert!(!accepts("email", "userexample.org"));
        assert!(!accepts("email", "a@b"));
    }

    #[test]
    fn uri_shape() {
        assert!(accepts("uri", "https://example.org/path"));
        assert!(accepts("uri", "ftp://host"));
        assert!(!accepts("uri", "example.org"));
    }

    #[test]
    fn uuid_shape() {
        assert!(accepts("uuid", "123e4567-e89b-12d3-a456-426614174000"));
        assert!(!accepts("uuid", "123e4567e89b12d3a456426614174000"));
    }

    #[test]
    fn date_shape() {
        assert!(accepts("date", "2024-02-29"));
        assert!(!accepts("date", "2024-2-29"));
    }

    #[test]
    fn ipv4_shape() {
        assert!(accepts("ipv4", "192.168.0.1"));
        assert!(!accepts("ipv4", "192.168.0"));
    }

    #[test]
    fn unknown_format_is_a_no_op() {
        let s = z3::ast::String::new_const("s");
        assert!(format_constraint(&s, "hostname-or-other").is_none());
        assert!(!is_builtin_format("hostname-or-other"));
    }
}
