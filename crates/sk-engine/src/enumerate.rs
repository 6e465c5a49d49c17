//! Object enumeration for final-state labels.

use sk_core::{Error, Flavor, ObjectHandle, Result};

/// List the object handles available in a row of the given final state.
///
/// For each species in canonical alphabet order (e, m, t, j, g): one
/// occurrence in the label yields a bare handle, N > 1 occurrences yield
/// suffixed handles 1..=N. The order depends only on the label, never on
/// kinematics, so it is stable across runs and usable as a tie-break basis.
///
/// An unrecognized letter is a configuration error, not a per-event
/// condition.
pub fn enumerate_objects(final_state: &str) -> Result<Vec<ObjectHandle>> {
    for c in final_state.chars() {
        if Flavor::from_letter(c).is_none() {
            return Err(Error::Config(format!(
                "unknown object letter '{c}' in final state '{final_state}'"
            )));
        }
    }
    let mut out = Vec::with_capacity(final_state.len());
    for flavor in Flavor::ALL {
        let n = final_state.chars().filter(|&c| c == flavor.letter()).count();
        match n {
            0 => {}
            1 => out.push(ObjectHandle::bare(flavor)),
            _ => {
                for i in 1..=n {
                    out.push(ObjectHandle::numbered(flavor, i as u8));
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(fs: &str) -> Vec<String> {
        enumerate_objects(fs).unwrap().iter().map(|h| h.label()).collect()
    }

    #[test]
    fn eem_enumerates_to_e1_e2_m() {
        assert_eq!(labels("eem"), ["e1", "e2", "m"]);
    }

    #[test]
    fn emm_single_electron_is_unsuffixed() {
        assert_eq!(labels("emm"), ["e", "m1", "m2"]);
    }

    #[test]
    fn alphabet_order_beats_label_order() {
        // "mme" still lists electrons first.
        assert_eq!(labels("mme"), ["e", "m1", "m2"]);
        assert_eq!(labels("emt"), ["e", "m", "t"]);
        assert_eq!(labels("mjg"), ["m", "j", "g"]);
    }

    #[test]
    fn unknown_letter_is_config_error() {
        assert!(matches!(enumerate_objects("exm"), Err(Error::Config(_))));
        // met is not an enumerable object
        assert!(enumerate_objects("emn").is_err());
    }
}
