//! Extracts every class-typed reference from a type descriptor or generic
//! signature fragment.
//!
//! Rules (per the classfile parser's type-descriptor scanning contract):
//! `L...;` emits one dotted class name; type arguments inside `<...>`
//! recurse; `+`, `-`, `*` wildcards, `[` array dimensions, and the `/` → `.`
//! conversion are all handled; primitive markers and type-variable
//! references (`T...;`) never emit a name, since they name a type
//! parameter rather than a concrete class.

pub fn scan_referenced_type_names(descriptor_or_signature: &str) -> Vec<String> {
    let chars: Vec<char> = descriptor_or_signature.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        i = scan_one(&chars, i, &mut out);
    }
    out
}

fn scan_one(chars: &[char], i: usize, out: &mut Vec<String>) -> usize {
    match chars.get(i) {
        Some('[') => scan_one(chars, i + 1, out),
        Some('+') | Some('-') => scan_one(chars, i + 1, out),
        Some('*') => i + 1,
        Some('L') => scan_class_ref(chars, i, out, true),
        Some('T') => scan_class_ref(chars, i, out, false),
        Some(_) => i + 1,
        None => i,
    }
}

/// `chars[i]` is `'L'` or `'T'`; scans through the matching top-level `;`,
/// recursing into any nested `L...;` type arguments along the way.
fn scan_class_ref(chars: &[char], i: usize, out: &mut Vec<String>, emit: bool) -> usize {
    let start = i + 1;
    let mut j = start;
    let mut depth: i32 = 0;
    while j < chars.len() {
        match chars[j] {
            '<' => {
                depth += 1;
                j += 1;
            }
            '>' => {
                depth -= 1;
                j += 1;
            }
            ';' if depth == 0 => break,
            'L' if depth > 0 => {
                j = scan_class_ref(chars, j, out, true);
            }
            'T' if depth > 0 => {
                j = scan_class_ref(chars, j, out, false);
            }
            _ => {
                j += 1;
            }
        }
    }
    if emit {
        let raw: String = chars[start..j].iter().collect();
        let base_name = raw.split('<').next().unwrap_or(&raw);
        out.push(base_name.replace('/', "."));
    }
    // skip the terminating ';', if present; malformed input without one
    // simply stops scanning here rather than panicking.
    if j < chars.len() { j + 1 } else { j }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_descriptor() {
        assert_eq!(
            scan_referenced_type_names("Ljava/lang/String;"),
            vec!["java.lang.String"]
        );
    }

    #[test]
    fn array_descriptor() {
        assert_eq!(
            scan_referenced_type_names("[Ljava/lang/String;"),
            vec!["java.lang.String"]
        );
    }

    #[test]
    fn generic_signature_with_wildcard_and_nested_refs() {
        let names = scan_referenced_type_names(
            "Ljava/util/Map<Ljava/lang/String;+Ljava/util/List<Ljava/lang/Integer;>;>;",
        );
        assert_eq!(
            names,
            vec![
                "java.util.Map",
                "java.lang.String",
                "java.util.List",
                "java.lang.Integer",
            ]
        );
    }

    #[test]
    fn type_variable_is_not_emitted() {
        assert_eq!(scan_referenced_type_names("TT;"), Vec::<String>::new());
    }

    #[test]
    fn primitive_descriptor_emits_nothing() {
        assert_eq!(scan_referenced_type_names("I"), Vec::<String>::new());
    }
}
