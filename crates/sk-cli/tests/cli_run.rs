use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_skim"))
}

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("skim_cli_{}_{}_{}", std::process::id(), nanos, tag));
    fs::create_dir_all(&p).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

/// One "eee" row passing the full WZ ladder.
fn wz_container() -> serde_json::Value {
    let mut cols: HashMap<String, f64> = HashMap::new();
    let mut set = |k: &str, v: f64| {
        cols.insert(k.to_string(), v);
    };

    set("run", 1.0);
    set("lumi", 1.0);
    set("evt", 1001.0);
    set("nvtx", 15.0);
    set("Mass", 250.0);
    set("pfMetEt", 35.0);
    set("pfMetPhi", 0.3);
    set("muEPass", 1.0);
    set("doubleMuPass", 0.0);
    set("doubleEPass", 0.0);
    for (l, pt, chg, mt) in [("e1", 45.0, 1.0, 60.0), ("e2", 30.0, -1.0, 50.0), ("e3", 25.0, 1.0, 70.0)] {
        set(&format!("{l}Pt"), pt);
        set(&format!("{l}Eta"), 0.5);
        set(&format!("{l}AbsEta"), 0.5);
        set(&format!("{l}Phi"), 0.1);
        set(&format!("{l}Charge"), chg);
        set(&format!("{l}RelPFIsoRho"), 0.05);
        set(&format!("{l}CBIDMedium"), 1.0);
        set(&format!("{l}MtToPFMET"), mt);
        set(&format!("{l}ToMETDPhi"), 1.0);
    }
    for (p, mass, ss) in [("e1_e2", 89.0, 0.0), ("e1_e3", 45.0, 1.0), ("e2_e3", 120.0, 0.0)] {
        set(&format!("{p}_Mass"), mass);
        set(&format!("{p}_DR"), 1.5);
        set(&format!("{p}_DPhi"), 1.9);
        set(&format!("{p}_SS"), ss);
    }
    set("eVetoMVAIsoVtx", 0.0);
    set("muVetoPt5IsoIdVtx", 0.0);
    set("muGlbIsoVetoPt10", 0.0);
    set("muVetoPt15IsoIdVtx", 0.0);
    set("jetVeto20", 0.0);
    set("jetVeto30", 0.0);
    set("jetVeto40", 0.0);
    set("bjetCSVVeto", 0.0);
    set("bjetCSVVeto30", 0.0);

    let columns: serde_json::Map<String, serde_json::Value> =
        cols.into_iter().map(|(k, v)| (k, serde_json::json!([v]))).collect();
    serde_json::json!({
        "event_count": 100,
        "final_states": { "eee": { "columns": columns } }
    })
}

#[test]
fn run_wz_sample_produces_table_and_cutflow() {
    let sample_dir = tmp_dir("sample").join("data_sample");
    fs::create_dir_all(&sample_dir).unwrap();
    fs::write(
        sample_dir.join("file0.json"),
        serde_json::to_string(&wz_container()).unwrap(),
    )
    .unwrap();
    let out_dir = tmp_dir("out");

    let output = run(&[
        "run",
        "--channel",
        "wz",
        "--output",
        out_dir.to_str().unwrap(),
        sample_dir.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "skim run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result_path = out_dir.join("data_sample.json");
    let text = fs::read_to_string(&result_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(v["channel"], "WZ");
    assert_eq!(v["sample"], "data_sample");
    assert_eq!(v["table"]["n_rows"], 1);

    let labels: Vec<String> = v["cutflow"]["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l.as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels.first().map(String::as_str), Some("No cuts"));
    assert_eq!(labels.last().map(String::as_str), Some("Best candidate"));

    let counts: Vec<f64> = v["cutflow"]["counts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_f64().unwrap())
        .collect();
    assert_eq!(counts[0], 100.0);
    assert_eq!(*counts.last().unwrap(), 1.0);
}

#[test]
fn unknown_channel_is_rejected() {
    let sample_dir = tmp_dir("sample2");
    let out_dir = tmp_dir("out2");
    let output = run(&[
        "run",
        "--channel",
        "nope",
        "--output",
        out_dir.to_str().unwrap(),
        sample_dir.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown channel"));
}

#[test]
fn empty_sample_dir_is_fatal() {
    let sample_dir = tmp_dir("sample3").join("empty_sample");
    fs::create_dir_all(&sample_dir).unwrap();
    let out_dir = tmp_dir("out3");
    let output = run(&[
        "run",
        "--channel",
        "wz",
        "--output",
        out_dir.to_str().unwrap(),
        sample_dir.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
}
