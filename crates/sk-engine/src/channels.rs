//! Built-in channel descriptors.
//!
//! Each constructor returns a fully wired [`ChannelSpec`]: role templates,
//! the labeled preselection ladder, ranking policy, store veto, and the
//! injected identification/weight closures. Cut thresholds follow the
//! multilepton analyses these channels reduce.

use std::sync::Arc;

use sk_core::{Flavor, MinKey, ObjectHandle, Result, RunPeriod};
use sk_ntuple::RowReader;

use crate::channel::{
    AltState, ChannelSpec, CutFn, IdFn, KeyFn, PairSign, RankingPolicy, RoleSet, RoleTemplate,
    VetoFn, WeightFn,
};
use crate::cuts::CutSequence;

/// PDG Z boson mass, GeV.
pub const Z_MASS: f64 = 91.1876;

const EM: [Flavor; 2] = [Flavor::Electron, Flavor::Muon];
const EMT: [Flavor; 3] = [Flavor::Electron, Flavor::Muon, Flavor::Tau];

/// Any-of trigger bit cut over the given path names.
fn any_trigger(paths: &'static [&'static str]) -> CutFn {
    Arc::new(move |row, _| {
        for path in paths {
            if row.flag(path)? {
                return Ok(true);
            }
        }
        Ok(false)
    })
}

fn trigger_cut(period: RunPeriod) -> CutFn {
    any_trigger(match period {
        RunPeriod::Tev8 => &[
            "mu17ele8isoPass",
            "mu8ele17isoPass",
            "doubleETightPass",
            "doubleMuPass",
            "doubleMuTrkPass",
        ],
        RunPeriod::Tev13 => &["muEPass", "doubleMuPass", "doubleEPass"],
    })
}

/// Hpp trigger list adds the triple-electron path.
fn trigger_cut_with_triple_e(period: RunPeriod) -> CutFn {
    any_trigger(match period {
        RunPeriod::Tev8 => &[
            "mu17ele8isoPass",
            "mu8ele17isoPass",
            "doubleETightPass",
            "tripleEPass",
            "doubleMuPass",
            "doubleMuTrkPass",
        ],
        RunPeriod::Tev13 => &["muEPass", "doubleMuPass", "doubleEPass", "tripleEPass"],
    })
}

/// Four-lepton trigger list additionally picks up the e-mu cross trigger.
fn trigger_cut_four_lepton(period: RunPeriod) -> CutFn {
    any_trigger(match period {
        RunPeriod::Tev8 => &[
            "mu17ele8isoPass",
            "mu8ele17isoPass",
            "doubleETightPass",
            "tripleEPass",
            "doubleMuPass",
            "doubleMuTrkPass",
        ],
        RunPeriod::Tev13 => &["muEPass", "eMuPass", "doubleMuPass", "doubleEPass", "tripleEPass"],
    })
}

/// Acceptance cut: species-dependent pt floor and |eta| ceiling for every
/// enumerated object.
fn fiducial_cut() -> CutFn {
    Arc::new(|row, objects| {
        for &h in objects {
            let (pt_floor, eta_ceil) = match h.flavor {
                Flavor::Electron => (10.0, 2.5),
                Flavor::Muon => (10.0, 2.4),
                Flavor::Tau => (20.0, 2.3),
                _ => continue,
            };
            if row.pt(h)? < pt_floor || row.abs_eta(h)? > eta_ceil {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// All enumerated objects must pass the given per-object predicate.
fn all_objects(id: IdFn) -> CutFn {
    Arc::new(move |row, objects| {
        for &h in objects {
            if !id(row, h)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// Leading-lepton pt thresholds implied by the double trigger menus.
fn trigger_threshold_cut() -> CutFn {
    Arc::new(|row, objects: &[ObjectHandle]| {
        let mut pts = Vec::with_capacity(objects.len());
        for &h in objects {
            pts.push(row.pt(h)?);
        }
        pts.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        Ok(pts[0] > 20.0 && pts[1] > 10.0)
    })
}

/// Every dilepton mass must sit above the low-mass resonance region.
fn qcd_suppression_cut() -> CutFn {
    Arc::new(|row, objects: &[ObjectHandle]| {
        for (i, &a) in objects.iter().enumerate() {
            for &b in &objects[i + 1..] {
                if row.pair_mass(a, b)? <= 12.0 {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    })
}

fn tau_id(row: &RowReader<'_>, h: ObjectHandle) -> Result<bool> {
    Ok(row.obj_flag(h, "AntiElectronTight")?
        && row.obj_flag(h, "AntiMuon3Tight")?
        && row.obj_flag(h, "TightIso3Hits")?)
}

fn tau_id_loose(row: &RowReader<'_>, h: ObjectHandle) -> Result<bool> {
    Ok(row.obj_flag(h, "AntiElectronLoose")?
        && row.obj_flag(h, "AntiMuon3Loose")?
        && row.obj_flag(h, "LooseIso3Hits")?)
}

/// Loose identification with the relaxed isolation requirement folded in;
/// used as the four-lepton preselection working point.
fn loose_id() -> IdFn {
    Arc::new(|row, h| match h.flavor {
        Flavor::Electron => Ok(row.obj_flag(h, "CBIDLoose")? && row.iso(h)? <= 0.2),
        Flavor::Muon => Ok(row.obj_flag(h, "PFIDLoose")? && row.iso(h)? <= 0.2),
        Flavor::Tau => tau_id_loose(row, h),
        _ => Ok(false),
    })
}

/// Tight identification without isolation: cut-based tight electrons,
/// PF-tight muons, 3-hit tight taus.
fn tight_id_noiso() -> IdFn {
    Arc::new(|row, h| match h.flavor {
        Flavor::Electron => row.obj_flag(h, "CBIDTight"),
        Flavor::Muon => row.obj_flag(h, "PFIDTight"),
        Flavor::Tau => tau_id(row, h),
        _ => Ok(false),
    })
}

/// Isolation requirement folded into an ID predicate; taus carry no
/// isolation variable and pass unconditionally.
fn isolated(row: &RowReader<'_>, h: ObjectHandle) -> Result<bool> {
    let cut = match h.flavor {
        Flavor::Electron => 0.15,
        Flavor::Muon => 0.12,
        _ => return Ok(true),
    };
    Ok(row.iso(h)? <= cut)
}

/// Extra-lepton veto: no additional identified electrons or soft muons at
/// the event vertex.
fn fourth_lepton_veto() -> VetoFn {
    Arc::new(|row| {
        Ok(row.get_int("eVetoMVAIsoVtx")? + row.get_int("muVetoPt5IsoIdVtx")? == 0)
    })
}

fn unit_weight() -> WeightFn {
    Arc::new(|_, _| Ok(1.0))
}

/// WZ trilepton channel.
///
/// Roles: `z1` = same-flavor opposite-sign lepton pair minimizing the Z
/// mass difference, `w1` = remaining lepton plus met. Stored only when the
/// fourth-lepton veto holds.
pub fn wz(period: RunPeriod) -> ChannelSpec {
    let tight: IdFn = {
        let noiso = tight_id_wz_noiso();
        Arc::new(move |row, h| Ok(noiso(row, h)? && isolated(row, h)?))
    };

    let preselection = CutSequence::new()
        .add("Trigger", trigger_cut(period))
        .add("Fiducial", fiducial_cut())
        .add("ID", all_objects(Arc::clone(&tight)))
        .add("3l Mass", Arc::new(|row, _| Ok(row.mass()? > 100.0)))
        .add(
            "Z Selection",
            Arc::new(|row, objects: &[ObjectHandle]| {
                let m = row.pair_mass(objects[0], objects[1])?;
                Ok((m - Z_MASS).abs() < 20.0 && row.pt(objects[0])? > 20.0)
            }),
        )
        .add(
            "W Selection",
            Arc::new(|row, objects: &[ObjectHandle]| {
                if row.pt(objects[2])? < 20.0 || row.met()? < 30.0 {
                    return Ok(false);
                }
                for &l in &objects[..2] {
                    if row.pair_dr(l, objects[2])? < 0.1 {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
        );

    let key_fn: KeyFn = Arc::new(|row, assignment| {
        let m = row.pair_mass(assignment[0], assignment[1])?;
        Ok(MinKey(vec![(m - Z_MASS).abs()]))
    });

    ChannelSpec {
        name: "WZ".into(),
        period,
        final_states: ["eee", "eem", "emm", "mmm"].map(String::from).to_vec(),
        role_set: RoleSet::new(vec![
            RoleTemplate::pair("z1", &EM, true, Some(PairSign::OppositeSign)),
            RoleTemplate::with_met("w1", &EM),
        ]),
        preselection,
        selection: None,
        ranking: RankingPolicy::Lexicographic { key_fn },
        store_veto: Some(fourth_lepton_veto()),
        alt_states: Vec::new(),
        tight_id: tight,
        pu_weight: unit_weight(),
        lep_scale: unit_weight(),
    }
}

/// WZ tight ID uses the medium cut-based electron working point.
fn tight_id_wz_noiso() -> IdFn {
    Arc::new(|row, h| match h.flavor {
        Flavor::Electron => row.obj_flag(h, "CBIDMedium"),
        Flavor::Muon => row.obj_flag(h, "PFIDTight"),
        Flavor::Tau => tau_id(row, h),
        _ => Ok(false),
    })
}

/// Doubly charged Higgs associated production, trilepton channel.
///
/// Roles: `h1` = same-sign lepton pair (any flavor mix), `h2` = lepton plus
/// met, with the `h1` and `h2` leading leptons required opposite in charge.
/// Ranking is veto-only; the `z`/`w` bookkeeping roles are chosen
/// independently and sentinel-filled when absent.
pub fn hpp3l(period: RunPeriod) -> ChannelSpec {
    let noiso = tight_id_noiso();
    let tight: IdFn = {
        let noiso = Arc::clone(&noiso);
        Arc::new(move |row, h| Ok(noiso(row, h)? && isolated(row, h)?))
    };

    let preselection = CutSequence::new()
        .add("Trigger", trigger_cut_with_triple_e(period))
        .add("Fiducial", fiducial_cut())
        .add("Trigger Threshold", trigger_threshold_cut())
        .add("ID", all_objects(noiso))
        .add(
            "Isolation",
            Arc::new(|row, objects: &[ObjectHandle]| {
                for &h in objects {
                    if !isolated(row, h)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
        )
        .add("QCD Suppression", qcd_suppression_cut());

    let z_key: KeyFn = Arc::new(|row, assignment| {
        let m = row.pair_mass(assignment[0], assignment[1])?;
        Ok(MinKey(vec![(m - Z_MASS).abs()]))
    });

    ChannelSpec {
        name: "Hpp3l".into(),
        period,
        final_states: ["eee", "eem", "eet", "emm", "emt", "ett", "mmm", "mmt", "mtt", "ttt"]
            .map(String::from)
            .to_vec(),
        role_set: RoleSet::new(vec![
            RoleTemplate::pair("h1", &EMT, false, Some(PairSign::SameSign)),
            RoleTemplate::with_met("h2", &EMT),
        ])
        .cross_opposite_sign(0, 1),
        preselection,
        selection: None,
        ranking: RankingPolicy::VetoOnly,
        store_veto: Some(fourth_lepton_veto()),
        alt_states: vec![AltState {
            role_set: RoleSet::new(vec![
                RoleTemplate::pair("z", &EMT, true, Some(PairSign::OppositeSign)),
                RoleTemplate::with_met("w", &EMT),
            ]),
            key_fn: z_key,
        }],
        tight_id: tight,
        pu_weight: unit_weight(),
        lep_scale: unit_weight(),
    }
}

/// Doubly charged Higgs pair production, four-lepton channel.
///
/// Roles: `h1` and `h2` are same-sign lepton pairs of opposite charge to
/// each other; the assignment minimizing the mass difference between the
/// two pairs wins. Preselection identifies leptons at the loose working
/// point, the stored tight flag re-runs the ladder with tight ID. The
/// `z1`/`z2` bookkeeping roles pick the same-flavor opposite-sign pairing
/// closest to the Z mass, then the harder second pair.
pub fn hpp4l(period: RunPeriod) -> ChannelSpec {
    let tight: IdFn = {
        let noiso = tight_id_wz_noiso();
        Arc::new(move |row, h| Ok(noiso(row, h)? && isolated(row, h)?))
    };

    let preselection = CutSequence::new()
        .add("Trigger", trigger_cut_four_lepton(period))
        .add("Fiducial", fiducial_cut())
        .add("Trigger Threshold", trigger_threshold_cut())
        .add("ID", all_objects(loose_id()))
        .add("QCD Suppression", qcd_suppression_cut());

    let selection = CutSequence::new()
        .add("Trigger", trigger_cut_four_lepton(period))
        .add("Fiducial", fiducial_cut())
        .add("Trigger Threshold", trigger_threshold_cut())
        .add("ID", all_objects(Arc::clone(&tight)))
        .add("QCD Suppression", qcd_suppression_cut());

    let key_fn: KeyFn = Arc::new(|row, assignment| {
        let m1 = row.pair_mass(assignment[0], assignment[1])?;
        let m2 = row.pair_mass(assignment[2], assignment[3])?;
        Ok(MinKey(vec![(m1 - m2).abs()]))
    });

    let z_key: KeyFn = Arc::new(|row, assignment| {
        let m1 = row.pair_mass(assignment[0], assignment[1])?;
        let st2 = row.pt(assignment[2])? + row.pt(assignment[3])?;
        Ok(MinKey(vec![(m1 - Z_MASS).abs(), -st2]))
    });

    ChannelSpec {
        name: "Hpp4l".into(),
        period,
        final_states: [
            "eeee", "eeem", "eeet", "eemm", "eemt", "eett", "emmm", "emmt", "emtt", "ettt",
            "mmmm", "mmmt", "mmtt", "mttt", "tttt",
        ]
        .map(String::from)
        .to_vec(),
        role_set: RoleSet::new(vec![
            RoleTemplate::pair("h1", &EMT, false, Some(PairSign::SameSign)),
            RoleTemplate::pair("h2", &EMT, false, Some(PairSign::SameSign)),
        ])
        .cross_opposite_sign(0, 1),
        preselection,
        selection: Some(selection),
        ranking: RankingPolicy::Lexicographic { key_fn },
        store_veto: None,
        alt_states: vec![AltState {
            role_set: RoleSet::new(vec![
                RoleTemplate::pair("z1", &EMT, true, Some(PairSign::OppositeSign)),
                RoleTemplate::pair("z2", &EMT, true, Some(PairSign::OppositeSign)),
            ]),
            key_fn: z_key,
        }],
        tight_id: tight,
        pu_weight: unit_weight(),
        lep_scale: unit_weight(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wz_descriptor_validates() {
        assert!(wz(RunPeriod::Tev13).validate().is_ok());
        assert!(wz(RunPeriod::Tev8).validate().is_ok());
    }

    #[test]
    fn hpp3l_descriptor_validates() {
        assert!(hpp3l(RunPeriod::Tev13).validate().is_ok());
    }

    #[test]
    fn hpp4l_descriptor_validates() {
        assert!(hpp4l(RunPeriod::Tev13).validate().is_ok());
        assert!(hpp4l(RunPeriod::Tev8).validate().is_ok());
    }

    #[test]
    fn hpp4l_cutflow_labels() {
        let c = hpp4l(RunPeriod::Tev13);
        assert_eq!(
            c.preselection.labels(),
            vec!["Trigger", "Fiducial", "Trigger Threshold", "ID", "QCD Suppression"]
        );
        assert!(c.selection.is_some());
    }

    #[test]
    fn wz_cutflow_labels() {
        let c = wz(RunPeriod::Tev13);
        assert_eq!(
            c.preselection.labels(),
            vec!["Trigger", "Fiducial", "ID", "3l Mass", "Z Selection", "W Selection"]
        );
    }

    #[test]
    fn hpp3l_cutflow_labels() {
        let c = hpp3l(RunPeriod::Tev13);
        assert_eq!(
            c.preselection.labels(),
            vec![
                "Trigger",
                "Fiducial",
                "Trigger Threshold",
                "ID",
                "Isolation",
                "QCD Suppression"
            ]
        );
    }
}
