//! End-to-end reduction through the WZ channel: ladder accounting,
//! cross-file event folding, and the lexicographic best-candidate store.

use std::collections::HashMap;
use std::sync::Arc;

use sk_core::RunPeriod;
use sk_engine::{channels, CutSequence, Engine, RunOutput};
use sk_ntuple::{ColumnData, RowBlock, Sample, SampleFile};

/// One "eee" row passing the full WZ ladder: e1/e2 an opposite-sign pair
/// at 89 GeV, e3 the W lepton at 25 GeV, met 35.
fn base_row(evt: f64) -> HashMap<String, f64> {
    let mut m = HashMap::new();
    let mut set = |k: &str, v: f64| {
        m.insert(k.to_string(), v);
    };

    set("run", 1.0);
    set("lumi", 1.0);
    set("evt", evt);
    set("nvtx", 12.0);
    set("Mass", 250.0);
    set("pfMetEt", 35.0);
    set("pfMetPhi", 0.3);

    set("muEPass", 1.0);
    set("doubleMuPass", 0.0);
    set("doubleEPass", 0.0);

    for (l, pt, eta, phi, chg, mt, dphi) in [
        ("e1", 45.0, 0.5, 0.1, 1.0, 60.0, 1.0),
        ("e2", 30.0, -0.3, 2.0, -1.0, 50.0, 0.8),
        ("e3", 25.0, 1.0, -1.5, 1.0, 70.0, 2.0),
    ] {
        set(&format!("{l}Pt"), pt);
        set(&format!("{l}Eta"), eta);
        set(&format!("{l}AbsEta"), eta.abs());
        set(&format!("{l}Phi"), phi);
        set(&format!("{l}Charge"), chg);
        set(&format!("{l}RelPFIsoRho"), 0.05);
        set(&format!("{l}CBIDMedium"), 1.0);
        set(&format!("{l}MtToPFMET"), mt);
        set(&format!("{l}ToMETDPhi"), dphi);
    }

    for (pair, mass, dr, dphi, ss) in [
        ("e1_e2", 89.0, 1.5, 1.9, 0.0),
        ("e1_e3", 45.0, 1.0, 1.6, 1.0),
        ("e2_e3", 120.0, 2.0, 2.2, 0.0),
    ] {
        set(&format!("{pair}_Mass"), mass);
        set(&format!("{pair}_DR"), dr);
        set(&format!("{pair}_DPhi"), dphi);
        set(&format!("{pair}_SS"), ss);
    }

    set("eVetoMVAIsoVtx", 0.0);
    set("muVetoPt5IsoIdVtx", 0.0);
    set("muGlbIsoVetoPt10", 0.0);
    set("muVetoPt15IsoIdVtx", 1.0);
    set("jetVeto20", 2.0);
    set("jetVeto30", 1.0);
    set("jetVeto40", 0.0);
    set("bjetCSVVeto", 0.0);
    set("bjetCSVVeto30", 0.0);

    m
}

fn eee_block(rows: &[HashMap<String, f64>]) -> RowBlock {
    let mut cols: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        for (k, &v) in row {
            cols.entry(k.clone()).or_default().push(v);
        }
    }
    RowBlock::new("eee", cols).unwrap()
}

fn run(files: Vec<SampleFile>) -> RunOutput {
    let mut engine = Engine::new(channels::wz(RunPeriod::Tev13)).unwrap();
    engine.process_sample(&Sample::from_files("test", files)).unwrap();
    engine.finalize("test").unwrap()
}

fn f64_column(out: &RunOutput, name: &str) -> Vec<f64> {
    match out.table.column(name).unwrap() {
        ColumnData::F64(v) => v.clone(),
        other => panic!("column {name} is not f64: {other:?}"),
    }
}

fn i64_column(out: &RunOutput, name: &str) -> Vec<i64> {
    match out.table.column(name).unwrap() {
        ColumnData::I64(v) => v.clone(),
        other => panic!("column {name} is not i64: {other:?}"),
    }
}

fn str_column(out: &RunOutput, name: &str) -> Vec<String> {
    match out.table.column(name).unwrap() {
        ColumnData::Str(v) => v.clone(),
        other => panic!("column {name} is not str: {other:?}"),
    }
}

#[test]
fn full_ladder_event_is_selected() {
    let file = SampleFile::from_blocks("f0", 100, vec![eee_block(&[base_row(1.0)])]);
    let out = run(vec![file]);

    assert_eq!(out.table.n_rows(), 1);
    assert_eq!(out.cutflow.count_for("No cuts"), Some(100.0));
    for label in [
        "All events",
        "Trigger",
        "Fiducial",
        "ID",
        "3l Mass",
        "Z Selection",
        "W Selection",
        "Candidate",
        "Best candidate",
    ] {
        assert_eq!(out.cutflow.count_for(label), Some(1.0), "bin {label}");
    }

    // The opposite-sign pair closest to the Z mass wins; the leftover
    // electron takes the W role.
    assert_eq!(f64_column(&out, "z1.mass"), vec![89.0]);
    assert_eq!(f64_column(&out, "w1.mass"), vec![70.0]);
    assert_eq!(f64_column(&out, "w1.met"), vec![35.0]);
    assert_eq!(str_column(&out, "z1Flv.Flv"), vec!["ee"]);
    assert_eq!(str_column(&out, "channel.channel"), vec!["eee"]);

    // Per-object group is pt-descending.
    assert_eq!(f64_column(&out, "l1.Pt"), vec![45.0]);
    assert_eq!(f64_column(&out, "l3.Pt"), vec![25.0]);

    // Jet and extra-lepton veto counters copy through from the globals.
    assert_eq!(i64_column(&out, "finalstate.jetVeto20"), vec![2]);
    assert_eq!(i64_column(&out, "finalstate.bjetVeto30"), vec![0]);
    assert_eq!(i64_column(&out, "finalstate.muonVeto10Loose"), vec![0]);
    assert_eq!(i64_column(&out, "finalstate.muonVeto15"), vec![1]);
}

#[test]
fn stricter_selection_clears_the_tight_flag() {
    let mut channel = channels::wz(RunPeriod::Tev13);
    channel.selection =
        Some(CutSequence::new().add("High met", Arc::new(|row, _| Ok(row.met()? > 50.0))));

    let file = SampleFile::from_blocks("f0", 10, vec![eee_block(&[base_row(9.0)])]);
    let mut engine = Engine::new(channel).unwrap();
    engine.process_sample(&Sample::from_files("test", vec![file])).unwrap();
    let out = engine.finalize("test").unwrap();

    // met 35 passes the preselection W cut but not the tighter selection,
    // so the event is stored flagged loose-only.
    assert_eq!(out.table.n_rows(), 1);
    assert_eq!(i64_column(&out, "select.passLoose"), vec![1]);
    assert_eq!(i64_column(&out, "select.passTight"), vec![0]);
}

#[test]
fn met_failure_truncates_the_ladder() {
    let mut row = base_row(2.0);
    row.insert("pfMetEt".to_string(), 10.0);
    let file = SampleFile::from_blocks("f0", 50, vec![eee_block(&[row])]);
    let out = run(vec![file]);

    assert_eq!(out.table.n_rows(), 0);
    assert_eq!(out.cutflow.count_for("Z Selection"), Some(1.0));
    assert_eq!(out.cutflow.count_for("W Selection"), Some(0.0));
    assert_eq!(out.cutflow.count_for("Candidate"), Some(0.0));
    assert_eq!(out.cutflow.count_for("Best candidate"), Some(0.0));
}

#[test]
fn duplicate_event_across_files_counted_once() {
    let f0 = SampleFile::from_blocks("f0", 10, vec![eee_block(&[base_row(7.0)])]);
    let f1 = SampleFile::from_blocks("f1", 10, vec![eee_block(&[base_row(7.0)])]);
    let out = run(vec![f0, f1]);

    // Upstream event counts sum; the reduced event does not.
    assert_eq!(out.cutflow.count_for("No cuts"), Some(20.0));
    assert_eq!(out.cutflow.count_for("All events"), Some(1.0));
    assert_eq!(out.table.n_rows(), 1);
}

#[test]
fn file_order_does_not_change_results() {
    // evt 1 appears in both files with different Z-pair masses; evt 2 only
    // in the second file.
    let mut worse = base_row(1.0);
    worse.insert("e1_e2_Mass".to_string(), 80.0);
    let better = base_row(1.0);
    let other = base_row(2.0);

    let f0 = SampleFile::from_blocks("f0", 5, vec![eee_block(&[worse.clone()])]);
    let f1 = SampleFile::from_blocks("f1", 5, vec![eee_block(&[better.clone(), other.clone()])]);

    let forward = run(vec![f0.clone(), f1.clone()]);
    let reverse = run(vec![f1, f0]);

    assert_eq!(
        serde_json::to_value(&forward.table).unwrap(),
        serde_json::to_value(&reverse.table).unwrap()
    );
    assert_eq!(
        serde_json::to_value(&forward.cutflow).unwrap(),
        serde_json::to_value(&reverse.cutflow).unwrap()
    );

    // Both orders keep the 89 GeV pair (|89 - mZ| < |80 - mZ|).
    assert_eq!(f64_column(&forward, "z1.mass"), vec![89.0, 89.0]);
}

#[test]
fn fourth_lepton_veto_blocks_storage() {
    let mut row = base_row(3.0);
    row.insert("eVetoMVAIsoVtx".to_string(), 1.0);
    let file = SampleFile::from_blocks("f0", 5, vec![eee_block(&[row])]);
    let out = run(vec![file]);

    // Candidates exist but the store gate holds them back.
    assert_eq!(out.cutflow.count_for("Candidate"), Some(1.0));
    assert_eq!(out.cutflow.count_for("Best candidate"), Some(0.0));
    assert_eq!(out.table.n_rows(), 0);
}

#[test]
fn reencounter_with_identical_content_is_idempotent() {
    let row = base_row(4.0);
    let once = run(vec![SampleFile::from_blocks("f0", 5, vec![eee_block(&[row.clone()])])]);
    let twice = run(vec![
        SampleFile::from_blocks("f0", 5, vec![eee_block(&[row.clone()])]),
        SampleFile::from_blocks("f1", 0, vec![eee_block(&[row])]),
    ]);

    assert_eq!(
        serde_json::to_value(&once.table).unwrap(),
        serde_json::to_value(&twice.table).unwrap()
    );
    assert_eq!(twice.cutflow.count_for("Best candidate"), Some(1.0));
}
