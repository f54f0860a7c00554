//! Skillset dump
//!
//! Reads a skill library plus monster scripts as JSON and writes one
//! flattened moveset per simulated level.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use enemy_skillset::core::config::DumpConfig;
use enemy_skillset::core::error::Result;
use enemy_skillset::core::types::MonsterId;
use enemy_skillset::decode::SkillRegistry;
use enemy_skillset::moveset::{
    flatten, merge_simple_enemy_remaining, LevelBehavior, SkillsetBuilder,
};
use enemy_skillset::script::{MonsterScript, ScriptFile};

/// Enemy skillset dump - simulate monster scripts into movesets
#[derive(Parser, Debug)]
#[command(name = "enemy_skillset")]
#[command(about = "Simulate enemy AI scripts and dump their movesets as JSON")]
struct Args {
    /// Script file with the skill library and monster scripts
    input: PathBuf,

    /// Where to write the dump (stdout when omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// TOML run configuration
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Process monsters one at a time
    #[arg(long)]
    sequential: bool,

    /// Only process these monsters
    #[arg(long = "monster")]
    monsters: Vec<MonsterId>,
}

#[derive(Serialize)]
struct MonsterSkillset {
    monster_id: MonsterId,
    levels: Vec<LevelBehavior>,
}

fn process(
    config: &DumpConfig,
    registry: &SkillRegistry,
    monster: &MonsterScript,
) -> Result<MonsterSkillset> {
    let mut card = monster.card.clone();
    config.apply_overrides(monster.monster_id, &mut card);
    let builder = SkillsetBuilder::new(registry, card);

    let mut skillsets = if config.all_levels {
        builder.build_levels(&monster.entries)?
    } else {
        vec![builder.build(&monster.entries)?]
    };

    let levels = skillsets
        .iter_mut()
        .map(|skillset| {
            if config.merge_simple_enemy_remaining && merge_simple_enemy_remaining(skillset) {
                info!(
                    monster = monster.monster_id,
                    level = skillset.level,
                    "merged one-enemy moveset"
                );
            }
            flatten(skillset)
        })
        .collect();

    info!(monster = monster.monster_id, "monster processed");
    Ok(MonsterSkillset {
        monster_id: monster.monster_id,
        levels,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DumpConfig::load(path)?,
        None => DumpConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let file: ScriptFile = serde_json::from_str(&fs::read_to_string(&args.input)?)?;
    let registry = SkillRegistry::from_opcodes(file.skills);
    info!(
        skills = registry.len(),
        monsters = file.monsters.len(),
        "script file loaded"
    );

    let selected: Vec<&MonsterScript> = file
        .monsters
        .iter()
        .filter(|m| args.monsters.is_empty() || args.monsters.contains(&m.monster_id))
        .collect();

    let run = |monster: &&MonsterScript| match process(&config, &registry, monster) {
        Ok(skillset) => Some(skillset),
        Err(e) => {
            warn!(monster = monster.monster_id, error = %e, "monster skipped");
            None
        }
    };
    let dump: Vec<MonsterSkillset> = if config.parallel && !args.sequential {
        selected.par_iter().filter_map(run).collect()
    } else {
        selected.iter().filter_map(run).collect()
    };

    let skipped = selected.len() - dump.len();
    info!(written = dump.len(), skipped, "dump finished");

    let json = if config.pretty {
        serde_json::to_string_pretty(&dump)?
    } else {
        serde_json::to_string(&dump)?
    };
    match &args.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}
