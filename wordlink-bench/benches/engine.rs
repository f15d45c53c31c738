//! Wordlink Benchmark Suite
//!
//! Targets, measured on a 10-section, 50-slot level:
//!   content_load_10x5 .................. < 1ms
//!   placement_to_slot_and_back ......... < 100μs (includes the in-memory save)
//!   cascade_complete_level ............. < 20μs
//!   reconcile_saved_level .............. < 50μs

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use wordlink_core::cascade;
use wordlink_core::content::ContentGraph;
use wordlink_core::engine::GameEngine;
use wordlink_core::placement::Placement;
use wordlink_core::reconcile;
use wordlink_core::types::LevelId;

const SECTIONS: usize = 10;
const SLOTS_PER_SECTION: usize = 5;

/// One level whose section `s` has slots `H{s}_{k}` each accepting word `W{s}_{k}`.
fn content_json() -> String {
    let mut sections = Vec::new();
    let mut hints = serde_json::Map::new();
    for s in 0..SECTIONS {
        let mut slots = Vec::new();
        let mut words = Vec::new();
        for k in 0..SLOTS_PER_SECTION {
            let hint = format!("H{s}_{k}");
            let word = format!("W{s}_{k}");
            hints.insert(hint.clone(), serde_json::json!({ "accepts": [word.clone()] }));
            slots.push(hint);
            words.push(word);
        }
        sections.push(serde_json::json!({ "slots": slots, "words": words }));
    }
    serde_json::json!({ "levels": [{ "sections": sections }], "hints": hints }).to_string()
}

/// An engine with every word placed in its matching slot.
fn solved_engine(json: &str) -> GameEngine {
    let mut engine = GameEngine::in_memory(ContentGraph::from_json(json).expect("content"));
    let level = LevelId::at(0);
    engine.load_level(&level).expect("load");
    let def = engine.content().levels[0].clone();
    for section in &def.sections {
        for (slot, word) in section.slots.iter().zip(&section.words) {
            let placement = Placement::to_slot(
                def.id.clone(),
                word.id.clone(),
                section.id.clone(),
                slot.id.clone(),
            );
            engine.place_word(&placement).expect("place");
        }
    }
    engine
}

fn bench_content_load(c: &mut Criterion) {
    let json = content_json();
    c.bench_function("content_load_10x5", |b| {
        b.iter(|| {
            let graph = ContentGraph::from_json(black_box(&json)).expect("content");
            black_box(graph);
        });
    });
}

fn bench_placement(c: &mut Criterion) {
    let json = content_json();
    let mut engine = GameEngine::in_memory(ContentGraph::from_json(&json).expect("content"));
    let level = LevelId::at(0);
    engine.load_level(&level).expect("load");

    let def = engine.content().levels[0].clone();
    let word = def.sections[0].words[0].id.clone();
    let to_slot = Placement::to_slot(
        def.id.clone(),
        word.clone(),
        def.sections[0].id.clone(),
        def.sections[0].slots[0].id.clone(),
    );
    let back = Placement::to_inventory(def.id.clone(), word);

    c.bench_function("placement_to_slot_and_back", |b| {
        b.iter(|| {
            black_box(engine.place_word(black_box(&to_slot)).expect("place"));
            black_box(engine.place_word(black_box(&back)).expect("back"));
        });
    });
}

fn bench_cascade(c: &mut Criterion) {
    let json = content_json();
    let engine = solved_engine(&json);
    let def = &engine.content().levels[0];
    let state = engine.level(&def.id).expect("loaded").clone();

    c.bench_function("cascade_complete_level", |b| {
        b.iter(|| {
            let mut state = state.clone();
            let report = cascade::run(&engine.content().hints, def, &mut state);
            black_box(report);
        });
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let json = content_json();
    let engine = solved_engine(&json);
    let def = &engine.content().levels[0];
    let record = engine.level(&def.id).expect("loaded").to_record();

    c.bench_function("reconcile_saved_level", |b| {
        b.iter(|| {
            let state = reconcile::reconcile(def, black_box(Some(&record)), true);
            black_box(state);
        });
    });
}

criterion_group!(
    benches,
    bench_content_load,
    bench_placement,
    bench_cascade,
    bench_reconcile,
);
criterion_main!(benches);
