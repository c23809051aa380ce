/// Names are the only identity shared across systems, so every comparison
/// goes through this normalization: lowercase, diacritics stripped, repeated
/// and surrounding whitespace collapsed.
pub(crate) fn normalize_name(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_space = !output.is_empty();
            continue;
        }
        if pending_space {
            output.push(' ');
            pending_space = false;
        }
        for lowered in ch.to_lowercase() {
            output.push(strip_diacritic(lowered));
        }
    }
    output
}

pub(crate) fn names_match(left: &str, right: &str) -> bool {
    let left = normalize_name(left);
    !left.is_empty() && left == normalize_name(right)
}

/// Containment either way, used only for Classroom course ↔ local group
/// preselection.
pub(crate) fn names_contain(left: &str, right: &str) -> bool {
    let left = normalize_name(left);
    let right = normalize_name(right);
    !left.is_empty() && !right.is_empty() && (left.contains(&right) || right.contains(&left))
}

fn strip_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_of_the_same_name_normalize_equal() {
        assert_eq!(normalize_name("Ana María"), "ana maria");
        assert_eq!(normalize_name("ana maria"), "ana maria");
        assert_eq!(normalize_name("  ANA   MARIA  "), "ana maria");
        assert_eq!(normalize_name("Muñoz Peña"), "munoz pena");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["  José  Ángel ", "ÑANDÚ", "a b c", ""] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn names_match_ignores_case_and_accents() {
        assert!(names_match("José Pérez", "jose perez"));
        assert!(!names_match("José Pérez", "Josefa Pérez"));
        assert!(!names_match("", ""));
    }

    #[test]
    fn names_contain_works_both_ways() {
        assert!(names_contain("Química 3A", "quimica"));
        assert!(names_contain("3a", "Química 3A"));
        assert!(!names_contain("Física", "Química"));
        assert!(!names_contain("", "Química"));
    }
}
