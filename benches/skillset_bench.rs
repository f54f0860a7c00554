use criterion::{black_box, criterion_group, criterion_main, Criterion};

use enemy_skillset::decode::SkillRegistry;
use enemy_skillset::moveset::SkillsetBuilder;
use enemy_skillset::script::ScriptFile;

fn skillset_benchmark(c: &mut Criterion) {
    let file: ScriptFile =
        serde_json::from_str(include_str!("../data/sample_scripts.json")).expect("sample parses");
    let registry = SkillRegistry::from_opcodes(file.skills);

    let mut group = c.benchmark_group("skillset builder");
    for monster in &file.monsters {
        let builder = SkillsetBuilder::new(&registry, monster.card.clone());
        group.bench_function(format!("monster {}", monster.monster_id), |b| {
            b.iter(|| builder.build_levels(black_box(&monster.entries)))
        });
    }
    group.finish();
}

criterion_group!(benches, skillset_benchmark);
criterion_main!(benches);
