//! Row materialization: project a selected candidate plus the full event
//! row into the flat output column set.
//!
//! This layer is a projection, never a physics calculation: every aggregate
//! comes from the row's precomputed pairwise/combination attributes. The
//! schema is built once per channel and [`materialize`] fills it exactly;
//! the two functions live together so they cannot drift apart.

use sk_core::{Error, Flavor, ObjectHandle, Result};
use sk_ntuple::{ColumnKind, ColumnSpec, OutputRecord, RowReader, SENTINEL};

use crate::candidates;
use crate::channel::{AltState, ChannelSpec, RoleMember, RoleTemplate};
use crate::select::best_of_encounter;

/// Output grouping for one object slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjCategory {
    Lepton,
    Jet,
    Photon,
}

impl ObjCategory {
    fn prefix(self) -> char {
        match self {
            ObjCategory::Lepton => 'l',
            ObjCategory::Jet => 'j',
            ObjCategory::Photon => 'g',
        }
    }
}

fn member_category(allowed: &[Flavor]) -> Result<ObjCategory> {
    if allowed.is_empty() {
        return Err(Error::Config("role member allows no species".into()));
    }
    if allowed.iter().all(|f| f.is_lepton()) {
        return Ok(ObjCategory::Lepton);
    }
    match allowed {
        [Flavor::Jet] => Ok(ObjCategory::Jet),
        [Flavor::Photon] => Ok(ObjCategory::Photon),
        _ => Err(Error::Config(
            "role member mixes leptonic and non-leptonic species".into(),
        )),
    }
}

fn flavor_of(handle: ObjectHandle) -> ObjCategory {
    match handle.flavor {
        Flavor::Electron | Flavor::Muon | Flavor::Tau => ObjCategory::Lepton,
        Flavor::Jet => ObjCategory::Jet,
        Flavor::Photon => ObjCategory::Photon,
    }
}

/// Fixed veto columns copied from event globals: output name → row branch.
const VETO_COLUMNS: [(&str, &str); 9] = [
    ("finalstate.jetVeto20", "jetVeto20"),
    ("finalstate.jetVeto30", "jetVeto30"),
    ("finalstate.jetVeto40", "jetVeto40"),
    ("finalstate.bjetVeto20", "bjetCSVVeto"),
    ("finalstate.bjetVeto30", "bjetCSVVeto30"),
    ("finalstate.muonVeto5", "muVetoPt5IsoIdVtx"),
    ("finalstate.muonVeto10Loose", "muGlbIsoVetoPt10"),
    ("finalstate.muonVeto15", "muVetoPt15IsoIdVtx"),
    ("finalstate.elecVeto10", "eVetoMVAIsoVtx"),
];

fn push_role_schema(schema: &mut Vec<ColumnSpec>, role: &RoleTemplate) {
    let ns = &role.name;
    schema.push(ColumnSpec::new(format!("{ns}.mass"), ColumnKind::F64));
    schema.push(ColumnSpec::new(format!("{ns}.sT"), ColumnKind::F64));
    schema.push(ColumnSpec::new(format!("{ns}.dPhi"), ColumnKind::F64));
    if role.n_objects() == 2 {
        schema.push(ColumnSpec::new(format!("{ns}.dR"), ColumnKind::F64));
    }
    if role.has_met() {
        schema.push(ColumnSpec::new(format!("{ns}.met"), ColumnKind::F64));
        schema.push(ColumnSpec::new(format!("{ns}.metPhi"), ColumnKind::F64));
    }
    for i in 1..=role.n_objects() {
        schema.push(ColumnSpec::new(format!("{ns}.Pt{i}"), ColumnKind::F64));
        schema.push(ColumnSpec::new(format!("{ns}.Eta{i}"), ColumnKind::F64));
        schema.push(ColumnSpec::new(format!("{ns}.Phi{i}"), ColumnKind::F64));
        schema.push(ColumnSpec::new(format!("{ns}.Iso{i}"), ColumnKind::F64));
        schema.push(ColumnSpec::new(format!("{ns}.Chg{i}"), ColumnKind::I64));
        schema.push(ColumnSpec::new(format!("{ns}.PassTight{i}"), ColumnKind::I64));
    }
    schema.push(ColumnSpec::new(format!("{ns}Flv.Flv"), ColumnKind::Str));
}

/// Build the channel's full output schema.
pub fn output_schema(channel: &ChannelSpec) -> Result<Vec<ColumnSpec>> {
    let mut schema = Vec::new();

    schema.push(ColumnSpec::new("select.passTight", ColumnKind::I64));
    schema.push(ColumnSpec::new("select.passLoose", ColumnKind::I64));

    for name in ["event.evt", "event.run", "event.lumi", "event.nvtx"] {
        schema.push(ColumnSpec::new(name, ColumnKind::I64));
    }
    schema.push(ColumnSpec::new("event.lep_scale", ColumnKind::F64));
    schema.push(ColumnSpec::new("event.pu_weight", ColumnKind::F64));

    schema.push(ColumnSpec::new("channel.channel", ColumnKind::Str));

    for name in ["finalstate.mass", "finalstate.sT", "finalstate.met", "finalstate.metPhi"] {
        schema.push(ColumnSpec::new(name, ColumnKind::F64));
    }
    for (name, _) in VETO_COLUMNS {
        schema.push(ColumnSpec::new(name, ColumnKind::I64));
    }

    for role in &channel.role_set.roles {
        push_role_schema(&mut schema, role);
    }
    for alt in &channel.alt_states {
        for role in &alt.role_set.roles {
            push_role_schema(&mut schema, role);
        }
    }

    // Per-object groups sized from the primary templates: l1..lN for
    // leptonic slots, j1.. for jets, g1.. for photons.
    let mut counts = [0usize; 3];
    for role in &channel.role_set.roles {
        for member in &role.members {
            if let RoleMember::Object { allowed } = member {
                match member_category(allowed)? {
                    ObjCategory::Lepton => counts[0] += 1,
                    ObjCategory::Jet => counts[1] += 1,
                    ObjCategory::Photon => counts[2] += 1,
                }
            }
        }
    }
    for (category, count) in
        [(ObjCategory::Lepton, counts[0]), (ObjCategory::Jet, counts[1]), (ObjCategory::Photon, counts[2])]
    {
        let prefix = category.prefix();
        for n in 1..=count {
            schema.push(ColumnSpec::new(format!("{prefix}{n}.Pt"), ColumnKind::F64));
            schema.push(ColumnSpec::new(format!("{prefix}{n}.Eta"), ColumnKind::F64));
            schema.push(ColumnSpec::new(format!("{prefix}{n}.Phi"), ColumnKind::F64));
            schema.push(ColumnSpec::new(format!("{prefix}{n}.Iso"), ColumnKind::F64));
            schema.push(ColumnSpec::new(format!("{prefix}{n}.Chg"), ColumnKind::I64));
            schema.push(ColumnSpec::new(format!("{prefix}{n}.PassTight"), ColumnKind::I64));
            schema.push(ColumnSpec::new(format!("{prefix}{n}Flv.Flv"), ColumnKind::Str));
        }
    }

    Ok(schema)
}

/// Sort handles by descending pt; stable, so pre-sorting canonically makes
/// canonical handle order the tie-break.
fn pt_ordered(row: &RowReader<'_>, handles: &[ObjectHandle]) -> Result<Vec<ObjectHandle>> {
    let mut out = handles.to_vec();
    out.sort();
    let mut keyed: Vec<(f64, ObjectHandle)> = Vec::with_capacity(out.len());
    for h in out {
        keyed.push((row.pt(h)?, h));
    }
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(keyed.into_iter().map(|(_, h)| h).collect())
}

fn fill_role_sentinel(record: &mut OutputRecord, role: &RoleTemplate) {
    let ns = &role.name;
    record.set_f64(format!("{ns}.mass"), SENTINEL);
    record.set_f64(format!("{ns}.sT"), SENTINEL);
    record.set_f64(format!("{ns}.dPhi"), SENTINEL);
    if role.n_objects() == 2 {
        record.set_f64(format!("{ns}.dR"), SENTINEL);
    }
    if role.has_met() {
        record.set_f64(format!("{ns}.met"), SENTINEL);
        record.set_f64(format!("{ns}.metPhi"), SENTINEL);
    }
    for i in 1..=role.n_objects() {
        record.set_f64(format!("{ns}.Pt{i}"), SENTINEL);
        record.set_f64(format!("{ns}.Eta{i}"), SENTINEL);
        record.set_f64(format!("{ns}.Phi{i}"), SENTINEL);
        record.set_f64(format!("{ns}.Iso{i}"), SENTINEL);
        record.set_i64(format!("{ns}.Chg{i}"), SENTINEL as i64);
        record.set_i64(format!("{ns}.PassTight{i}"), SENTINEL as i64);
    }
    record.set_str(format!("{ns}Flv.Flv"), "a".repeat(role.n_objects().max(1)));
}

fn fill_role(
    channel: &ChannelSpec,
    record: &mut OutputRecord,
    row: &RowReader<'_>,
    role: &RoleTemplate,
    members: &[ObjectHandle],
) -> Result<()> {
    let ns = &role.name;
    match (role.n_objects(), role.has_met()) {
        (1, false) => {
            record.set_f64(format!("{ns}.mass"), SENTINEL);
            record.set_f64(format!("{ns}.sT"), row.pt(members[0])?);
            record.set_f64(format!("{ns}.dPhi"), SENTINEL);
        }
        (1, true) => {
            record.set_f64(format!("{ns}.mass"), row.mt_to_met(members[0])?);
            record.set_f64(format!("{ns}.sT"), row.pt(members[0])? + row.met()?);
            record.set_f64(format!("{ns}.dPhi"), row.met_dphi(members[0])?);
            record.set_f64(format!("{ns}.met"), row.met()?);
            record.set_f64(format!("{ns}.metPhi"), row.met_phi()?);
        }
        (2, false) => {
            record.set_f64(format!("{ns}.mass"), row.pair_mass(members[0], members[1])?);
            record.set_f64(format!("{ns}.sT"), row.pt(members[0])? + row.pt(members[1])?);
            record.set_f64(format!("{ns}.dPhi"), row.pair_dphi(members[0], members[1])?);
            record.set_f64(format!("{ns}.dR"), row.pair_dr(members[0], members[1])?);
        }
        layout => {
            return Err(Error::Config(format!(
                "role '{ns}' has unsupported layout {layout:?}"
            )));
        }
    }

    let ordered = pt_ordered(row, members)?;
    for (i, &h) in ordered.iter().enumerate() {
        let i = i + 1;
        record.set_f64(format!("{ns}.Pt{i}"), row.pt(h)?);
        record.set_f64(format!("{ns}.Eta{i}"), row.eta(h)?);
        record.set_f64(format!("{ns}.Phi{i}"), row.phi(h)?);
        record.set_f64(format!("{ns}.Iso{i}"), row.iso(h)?);
        record.set_i64(format!("{ns}.Chg{i}"), row.charge(h)? as i64);
        record.set_i64(format!("{ns}.PassTight{i}"), (channel.tight_id)(row, h)? as i64);
    }

    // Flavor tag keeps assignment order (the role's semantic order), not
    // the pt ordering.
    let tag: String = members.iter().map(|h| h.flavor.letter()).collect();
    record.set_str(format!("{ns}Flv.Flv"), tag);
    Ok(())
}

fn fill_state(
    channel: &ChannelSpec,
    record: &mut OutputRecord,
    row: &RowReader<'_>,
    roles: &[RoleTemplate],
    assignment: Option<&[ObjectHandle]>,
) -> Result<()> {
    let mut slot = 0;
    for role in roles {
        let n = role.n_objects();
        match assignment {
            Some(handles) => fill_role(channel, record, row, role, &handles[slot..slot + n])?,
            None => fill_role_sentinel(record, role),
        }
        slot += n;
    }
    Ok(())
}

/// Pick an alternative state's assignment, independently of the primary
/// selection: best surviving permutation by the alt state's own key.
fn choose_alternative(
    alt: &AltState,
    row: &RowReader<'_>,
    objects: &[ObjectHandle],
) -> Result<Option<Vec<ObjectHandle>>> {
    let cands = candidates::generate(&alt.role_set, &alt.key_fn, row, objects)?;
    Ok(best_of_encounter(&cands).map(|c| c.assignment.clone()))
}

/// Build the flat output record for one selected candidate.
///
/// `assignment` is the winning role assignment; `pass_loose`/`pass_tight`
/// are the memoized cut-sequence results for this row visit. Does not
/// mutate the row.
pub fn materialize(
    channel: &ChannelSpec,
    row: &RowReader<'_>,
    assignment: &[ObjectHandle],
    pass_loose: bool,
    pass_tight: bool,
) -> Result<OutputRecord> {
    let mut record = OutputRecord::new();

    record.set_i64("select.passTight", pass_tight as i64);
    record.set_i64("select.passLoose", pass_loose as i64);

    let key = row.event_key()?;
    record.set_i64("event.evt", key.evt);
    record.set_i64("event.run", key.run);
    record.set_i64("event.lumi", key.lumi);
    record.set_i64("event.nvtx", row.nvtx()?);
    record.set_f64("event.lep_scale", (channel.lep_scale)(row, assignment)?);
    record.set_f64("event.pu_weight", (channel.pu_weight)(row, assignment)?);

    let channel_tag: String = assignment.iter().map(|h| h.flavor.letter()).collect();
    record.set_str("channel.channel", channel_tag);

    record.set_f64("finalstate.mass", row.mass()?);
    let mut st = 0.0;
    for &h in assignment {
        st += row.pt(h)?;
    }
    record.set_f64("finalstate.sT", st);
    record.set_f64("finalstate.met", row.met()?);
    record.set_f64("finalstate.metPhi", row.met_phi()?);
    for (name, branch) in VETO_COLUMNS {
        record.set_i64(name, row.get_int(branch)?);
    }

    fill_state(channel, &mut record, row, &channel.role_set.roles, Some(assignment))?;

    // Alternative states are re-chosen from the full object list, which is
    // the canonical resort of the assignment (a permutation of it).
    let mut objects = assignment.to_vec();
    objects.sort();
    for alt in &channel.alt_states {
        let chosen = choose_alternative(alt, row, &objects)?;
        fill_state(channel, &mut record, row, &alt.role_set.roles, chosen.as_deref())?;
    }

    // Final-state object groups, all selected objects by descending pt.
    let ordered = pt_ordered(row, assignment)?;
    let mut counters = [0usize; 3];
    for &h in &ordered {
        let category = flavor_of(h);
        let idx = match category {
            ObjCategory::Lepton => {
                counters[0] += 1;
                counters[0]
            }
            ObjCategory::Jet => {
                counters[1] += 1;
                counters[1]
            }
            ObjCategory::Photon => {
                counters[2] += 1;
                counters[2]
            }
        };
        let prefix = category.prefix();
        record.set_f64(format!("{prefix}{idx}.Pt"), row.pt(h)?);
        record.set_f64(format!("{prefix}{idx}.Eta"), row.eta(h)?);
        record.set_f64(format!("{prefix}{idx}.Phi"), row.phi(h)?);
        record.set_f64(format!("{prefix}{idx}.Iso"), row.iso(h)?);
        record.set_i64(format!("{prefix}{idx}.Chg"), row.charge(h)? as i64);
        record.set_i64(format!("{prefix}{idx}.PassTight"), (channel.tight_id)(row, h)? as i64);
        record.set_str(format!("{prefix}{idx}Flv.Flv"), h.flavor.letter().to_string());
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_categories() {
        assert_eq!(
            member_category(&[Flavor::Electron, Flavor::Muon, Flavor::Tau]).unwrap(),
            ObjCategory::Lepton
        );
        assert_eq!(member_category(&[Flavor::Jet]).unwrap(), ObjCategory::Jet);
        assert!(member_category(&[Flavor::Electron, Flavor::Jet]).is_err());
        assert!(member_category(&[]).is_err());
    }
}
