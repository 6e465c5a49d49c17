//! Common data types for skimmer

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data-taking period, selecting which trigger/ID flag names apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPeriod {
    /// 8 TeV data-taking
    Tev8,
    /// 13 TeV data-taking
    Tev13,
}

impl std::str::FromStr for RunPeriod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "8" => Ok(RunPeriod::Tev8),
            "13" => Ok(RunPeriod::Tev13),
            other => Err(crate::Error::Config(format!("unknown run period '{other}'"))),
        }
    }
}

/// Final-state object species.
///
/// The enumeration order (e, m, t, j, g) is the canonical alphabet order
/// used everywhere: object enumeration, symmetric-pair pruning, and output
/// tie-breaks. Missing energy is not a species; it never appears in a
/// final-state label as an enumerable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Flavor {
    /// Electron
    Electron,
    /// Muon
    Muon,
    /// Tau
    Tau,
    /// Jet
    Jet,
    /// Photon
    Photon,
}

impl Flavor {
    /// All species in canonical alphabet order.
    pub const ALL: [Flavor; 5] =
        [Flavor::Electron, Flavor::Muon, Flavor::Tau, Flavor::Jet, Flavor::Photon];

    /// Single-letter label used in attribute names and flavor tags.
    pub fn letter(self) -> char {
        match self {
            Flavor::Electron => 'e',
            Flavor::Muon => 'm',
            Flavor::Tau => 't',
            Flavor::Jet => 'j',
            Flavor::Photon => 'g',
        }
    }

    /// Parse a final-state letter. `None` for anything outside the alphabet.
    pub fn from_letter(c: char) -> Option<Flavor> {
        match c {
            'e' => Some(Flavor::Electron),
            'm' => Some(Flavor::Muon),
            't' => Some(Flavor::Tau),
            'j' => Some(Flavor::Jet),
            'g' => Some(Flavor::Photon),
            _ => None,
        }
    }

    /// Electron, muon, or tau.
    pub fn is_lepton(self) -> bool {
        matches!(self, Flavor::Electron | Flavor::Muon | Flavor::Tau)
    }
}

/// Handle to one reconstructed object within the current final state.
///
/// `index` is 0 for a bare handle (the only object of its species in the
/// final state, e.g. `e` in "emm") and 1-based otherwise (`m1`, `m2`).
/// The derived ordering is flavor rank then index, which is the canonical
/// order used for symmetric-pair pruning and tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle {
    /// Object species.
    pub flavor: Flavor,
    /// 0 for a bare handle, otherwise the 1-based suffix.
    pub index: u8,
}

impl ObjectHandle {
    /// A bare (unsuffixed) handle.
    pub fn bare(flavor: Flavor) -> Self {
        ObjectHandle { flavor, index: 0 }
    }

    /// A suffixed handle (`index` counted from 1).
    pub fn numbered(flavor: Flavor, index: u8) -> Self {
        ObjectHandle { flavor, index }
    }

    /// The attribute-name label: `e`, `m1`, `t2`, ...
    pub fn label(&self) -> String {
        if self.index == 0 {
            self.flavor.letter().to_string()
        } else {
            format!("{}{}", self.flavor.letter(), self.index)
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Unique physical-event identifier: (run, lumi, event).
///
/// The same key may be encountered in more than one input file of a sample;
/// all per-event state is keyed and deduplicated by this triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    /// Run number.
    pub run: i64,
    /// Luminosity block.
    pub lumi: i64,
    /// Event number within the lumi block.
    pub evt: i64,
}

/// Ordered tuple of real-valued scores ranking competing candidates.
///
/// Smaller is better, compared lexicographically with first-element
/// priority. A key never supersedes an incumbent it ties with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinKey(pub Vec<f64>);

impl MinKey {
    /// The initial incumbent: all elements positive infinity, so any finite
    /// key of the same arity supersedes it.
    pub fn worst(len: usize) -> Self {
        MinKey(vec![f64::INFINITY; len])
    }

    /// Lexicographic strict-improvement test against the stored incumbent.
    ///
    /// Returns true iff this key has a strictly smaller element at the first
    /// position where the two differ. Ties (and NaN comparisons) go to the
    /// incumbent.
    pub fn supersedes(&self, incumbent: &MinKey) -> bool {
        for (a, b) in self.0.iter().zip(incumbent.0.iter()) {
            if a < b {
                return true;
            }
            if a > b {
                return false;
            }
        }
        false
    }
}
