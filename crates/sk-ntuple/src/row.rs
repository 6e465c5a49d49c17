//! Columnar event rows and the typed attribute accessor.

use std::collections::HashMap;

use sk_core::{Error, EventKey, Flavor, ObjectHandle, Result};

/// All rows of one final state within one input file, stored column-wise.
///
/// Same layout as a branch-name → data map read from an upstream tree; all
/// columns must have equal length.
#[derive(Debug, Clone)]
pub struct RowBlock {
    final_state: String,
    len: usize,
    columns: HashMap<String, Vec<f64>>,
}

impl RowBlock {
    /// Build a block, validating that all columns agree in length.
    pub fn new(final_state: impl Into<String>, columns: HashMap<String, Vec<f64>>) -> Result<Self> {
        let final_state = final_state.into();
        let mut len = None;
        for (name, col) in &columns {
            match len {
                None => len = Some(col.len()),
                Some(n) if n != col.len() => {
                    return Err(Error::Config(format!(
                        "column '{}' in final state '{}' has {} rows, expected {}",
                        name,
                        final_state,
                        col.len(),
                        n
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(RowBlock { final_state, len: len.unwrap_or(0), columns })
    }

    /// Final-state label this block belongs to.
    pub fn final_state(&self) -> &str {
        &self.final_state
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the block holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Typed accessor for row `idx`. Panics if `idx` is out of range; the
    /// engine only iterates `0..len()`.
    pub fn reader(&self, idx: usize) -> RowReader<'_> {
        assert!(idx < self.len, "row index out of range");
        RowReader { block: self, idx }
    }
}

/// Typed, read-only accessor for one event row.
///
/// This is the single place where attribute key strings are formatted from
/// handle labels; selection and materialization code never builds key
/// strings itself. A missing key is an input-format mismatch and is fatal.
#[derive(Clone, Copy)]
pub struct RowReader<'a> {
    block: &'a RowBlock,
    idx: usize,
}

impl<'a> RowReader<'a> {
    /// Raw scalar lookup by attribute name.
    pub fn get(&self, name: &str) -> Result<f64> {
        match self.block.columns.get(name) {
            Some(col) => Ok(col[self.idx]),
            None => Err(Error::MissingBranch {
                branch: name.to_string(),
                final_state: self.block.final_state.clone(),
            }),
        }
    }

    /// Raw scalar lookup truncated to integer.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        Ok(self.get(name)? as i64)
    }

    /// Named event-global flag (trigger bit, veto count), true when > 0.
    pub fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)? > 0.0)
    }

    /// The (run, lumi, evt) key identifying this physical event.
    pub fn event_key(&self) -> Result<EventKey> {
        Ok(EventKey {
            run: self.get_int("run")?,
            lumi: self.get_int("lumi")?,
            evt: self.get_int("evt")?,
        })
    }

    /// Reconstructed vertex count.
    pub fn nvtx(&self) -> Result<i64> {
        self.get_int("nvtx")
    }

    /// Invariant mass of the full final state.
    pub fn mass(&self) -> Result<f64> {
        self.get("Mass")
    }

    /// Missing transverse energy magnitude.
    pub fn met(&self) -> Result<f64> {
        self.get("pfMetEt")
    }

    /// Missing transverse energy azimuth.
    pub fn met_phi(&self) -> Result<f64> {
        self.get("pfMetPhi")
    }

    /// Transverse momentum of one object.
    pub fn pt(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}Pt", h))
    }

    /// Pseudorapidity of one object.
    pub fn eta(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}Eta", h))
    }

    /// |eta| of one object (stored upstream, not recomputed).
    pub fn abs_eta(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}AbsEta", h))
    }

    /// Azimuth of one object.
    pub fn phi(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}Phi", h))
    }

    /// Electric charge of one object.
    pub fn charge(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}Charge", h))
    }

    /// Relative isolation, dispatched on species: rho-corrected for
    /// electrons, delta-beta for muons. Objects without an isolation
    /// variable (taus, jets, photons) report -1.
    pub fn iso(&self, h: ObjectHandle) -> Result<f64> {
        match h.flavor {
            Flavor::Electron => self.get(&format!("{}RelPFIsoRho", h)),
            Flavor::Muon => self.get(&format!("{}RelPFIsoDBDefault", h)),
            _ => Ok(-1.0),
        }
    }

    /// Arbitrary per-object flag branch (`<handle><name>`): identification
    /// bits and other channel-specific booleans.
    pub fn obj_flag(&self, h: ObjectHandle, name: &str) -> Result<bool> {
        Ok(self.get(&format!("{}{}", h, name))? > 0.5)
    }

    /// Transverse mass of one object with the missing energy.
    pub fn mt_to_met(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}MtToPFMET", h))
    }

    /// Delta-phi of one object to the missing energy.
    pub fn met_dphi(&self, h: ObjectHandle) -> Result<f64> {
        self.get(&format!("{}ToMETDPhi", h))
    }

    /// Pairwise invariant mass.
    pub fn pair_mass(&self, a: ObjectHandle, b: ObjectHandle) -> Result<f64> {
        self.pair(a, b, "Mass")
    }

    /// Pairwise delta-R.
    pub fn pair_dr(&self, a: ObjectHandle, b: ObjectHandle) -> Result<f64> {
        self.pair(a, b, "DR")
    }

    /// Pairwise delta-phi.
    pub fn pair_dphi(&self, a: ObjectHandle, b: ObjectHandle) -> Result<f64> {
        self.pair(a, b, "DPhi")
    }

    /// Same-sign flag for a pair, true when the stored flag is > 0.5.
    pub fn same_sign(&self, a: ObjectHandle, b: ObjectHandle) -> Result<bool> {
        Ok(self.pair(a, b, "SS")? > 0.5)
    }

    /// Pairwise attributes are stored in one orientation only. Try the
    /// canonical (handle-ordered) key first, then the swapped key, so the
    /// caller never has to know the upstream pair orientation.
    fn pair(&self, a: ObjectHandle, b: ObjectHandle, var: &str) -> Result<f64> {
        let (x, y) = if a <= b { (a, b) } else { (b, a) };
        let key = format!("{}_{}_{}", x, y, var);
        if self.block.columns.contains_key(&key) {
            return self.get(&key);
        }
        self.get(&format!("{}_{}_{}", y, x, var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_core::Flavor;

    fn block() -> RowBlock {
        let mut cols = HashMap::new();
        cols.insert("ePt".to_string(), vec![25.0, 30.0]);
        cols.insert("m1_m2_Mass".to_string(), vec![91.0, 60.0]);
        cols.insert("run".to_string(), vec![1.0, 1.0]);
        cols.insert("lumi".to_string(), vec![2.0, 2.0]);
        cols.insert("evt".to_string(), vec![100.0, 101.0]);
        RowBlock::new("eem", cols).unwrap()
    }

    #[test]
    fn typed_access_and_event_key() {
        let b = block();
        let r = b.reader(1);
        assert_eq!(r.pt(ObjectHandle::bare(Flavor::Electron)).unwrap(), 30.0);
        let key = r.event_key().unwrap();
        assert_eq!((key.run, key.lumi, key.evt), (1, 2, 101));
    }

    #[test]
    fn pair_access_is_orientation_free() {
        let b = block();
        let r = b.reader(0);
        let m1 = ObjectHandle::numbered(Flavor::Muon, 1);
        let m2 = ObjectHandle::numbered(Flavor::Muon, 2);
        assert_eq!(r.pair_mass(m1, m2).unwrap(), 91.0);
        assert_eq!(r.pair_mass(m2, m1).unwrap(), 91.0);
    }

    #[test]
    fn missing_branch_is_an_error() {
        let b = block();
        let r = b.reader(0);
        let err = r.get("eEta").unwrap_err();
        assert!(matches!(err, Error::MissingBranch { .. }));
    }

    #[test]
    fn mismatched_column_lengths_rejected() {
        let mut cols = HashMap::new();
        cols.insert("a".to_string(), vec![1.0]);
        cols.insert("b".to_string(), vec![1.0, 2.0]);
        assert!(RowBlock::new("ee", cols).is_err());
    }
}
