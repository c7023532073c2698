//! Sprite Sim Demo
//!
//! Runs a scripted volley of spells through an outdoor field and an
//! indoor room, then replays both runs to check the state hashes match.
//!
//! Usage: `sprite-sim [config.json] [objects.json]`

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sprite_sim::{
    TICKS_PER_SECOND, VERSION,
    Vec3i,
    game::{
        actor::Actor,
        config::SimConfig,
        descriptor::ObjectList,
        events::SimEventData,
        level::{BoxLevel, Decoration, Face, LevelGeometry, PolygonType, Rect},
        party::Party,
        pid::Pid,
        registry::SpawnOrigin,
        sprite::{SkillMastery, SpriteAttributes, SpriteType},
        state::SimState,
        tick::{replay, tick},
        trap::{drop_item_at, trigger_trap},
    },
};

/// Length of each demo run.
const DEMO_TICKS: usize = 4 * TICKS_PER_SECOND as usize;

/// Elapsed ticks per frame, roughly 30 fps.
const FRAME_ELAPSED: i32 = 4;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Sprite Sim v{}", VERSION);
    info!("Tick Rate: {} Hz", TICKS_PER_SECOND);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load(&path).with_context(|| format!("loading config from {}", path))?,
        None => SimConfig::default(),
    };
    let objects = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            ObjectList::from_json_str(&text).with_context(|| format!("parsing descriptor table {}", path))?
        }
        None => ObjectList::standard(),
    };
    info!("{} object descriptors, gravity {}", objects.len(), config.gravity);

    let outdoor = {
        let mut level = BoxLevel::outdoor(20000, 0).with_water(Rect::new(2000, -2000, 4000, 2000));
        level.add_decoration(Decoration { position: Vec3i::new(600, 700, 0), radius: 60, height: 500 });
        Arc::new(level) as Arc<dyn LevelGeometry>
    };
    let indoor = {
        let mut level = BoxLevel::indoor_room(1500, 0, 600);
        level.set_face_event(1, 17);
        // Ramp rising toward the back wall.
        let ramp = level.add_face(Face {
            polygon: PolygonType::InBetweenFloorAndWall,
            normal: Vec3i::new(-46341, 0, 46341),
            distance: -848,
            min: Vec3i::new(1200, -1500, 0),
            max: Vec3i::new(1500, 1500, 300),
            event_id: 0,
        });
        level.set_face_event(ramp, 18);
        Arc::new(level) as Arc<dyn LevelGeometry>
    };

    run_demo("outdoor", outdoor, &config, &objects)?;
    run_demo("indoor", indoor, &config, &objects)?;
    Ok(())
}

/// Party at the origin facing a goblin pack along +X.
fn demo_scene(level: Arc<dyn LevelGeometry>, config: &SimConfig, objects: &ObjectList) -> SimState {
    let mut state = SimState::new(level, config.clone()).with_objects(objects.clone());
    state.party = Party::at(Vec3i::new(0, 0, 0));
    state.item_sprites.insert(SpriteType::DROPPED_ITEM, 151);

    for i in 0..4 {
        let mut goblin = Actor::new(20, Vec3i::new(1000 + 80 * i, -120 + 80 * i, 0), 40, 120);
        goblin.to_hit_radius = 48;
        state.add_actor(goblin);
    }
    let mut shaman = Actor::new(21, Vec3i::new(1300, 300, 0), 40, 140);
    shaman.ally_group = 20;
    let shaman = state.add_actor(shaman);

    let eye = Vec3i::new(0, 0, state.party.eye_level);
    let casts = [
        (SpriteType::SPELL_FIRE_FIREBALL, 1, 0, 1500, SkillMastery::Expert),
        (SpriteType::SPELL_EARTH_DEATH_BLOSSOM, 2, 128, 1200, SkillMastery::Master),
        (SpriteType::SPELL_WATER_ICE_BLAST, 3, 0, 1000, SkillMastery::Grandmaster),
        (SpriteType::SPELL_DARK_SHRINKING_RAY, 4, 0, 2000, SkillMastery::Grandmaster),
    ];
    for (kind, portrait, pitch, speed, mastery) in casts {
        let Some(h) = state.spawn(kind, eye, 0, pitch, speed, SpawnOrigin::Portrait(portrait)) else {
            continue;
        };
        if let Some(o) = state.registry.slot_mut(h.slot()) {
            o.caster = Pid::player(portrait as usize - 1);
            o.spell_mastery = mastery;
            o.spell_level = 7;
        }
    }

    // The shaman answers with a firebolt at the party.
    let from = state.actors[shaman].position + Vec3i::new(0, 0, 100);
    if let Some(h) = state.spawn(SpriteType::PROJECTILE_FIREBOLT, from, 1024 + 110, 0, 1800, SpawnOrigin::Caster) {
        if let Some(o) = state.registry.slot_mut(h.slot()) {
            o.caster = Pid::actor(shaman);
        }
    }

    drop_item_at(
        &mut state,
        SpriteType::DROPPED_ITEM,
        Vec3i::new(500, -500, 200),
        600,
        3,
        true,
        SpriteAttributes::default(),
        None,
    );
    trigger_trap(&mut state, SpriteType::TRAP_FIRE, Vec3i::new(200, 0, 100));
    state
}

fn run_demo(name: &str, level: Arc<dyn LevelGeometry>, config: &SimConfig, objects: &ObjectList) -> Result<()> {
    info!("=== {} demo ===", name);

    let mut state = demo_scene(Arc::clone(&level), config, objects);
    info!("{} sprites launched", state.registry.live_count());

    // Events from scene setup (trap damage) count toward the run.
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut all_events = state.take_events();
    for t in 0..DEMO_TICKS {
        let result = tick(&mut state, FRAME_ELAPSED);
        if t % TICKS_PER_SECOND as usize == 0 {
            info!("Tick {}: {} live sprites, {} reclaimed", state.tick, result.live_sprites, result.reclaimed);
        }
        all_events.extend(result.events);
    }

    for event in &all_events {
        let label = match &event.data {
            SimEventData::Sound { .. } | SimEventData::SpellSound { .. } => "sounds",
            SimEventData::TrailParticle { .. } | SimEventData::ParticleBurst { .. } => "particles",
            SimEventData::FaceTrigger { .. } => "face triggers",
            SimEventData::Damage { .. } | SimEventData::AreaAttack { .. } => "damage requests",
            SimEventData::BuffApplied { .. } => "buffs",
            SimEventData::PartyMemberDamaged { .. } | SimEventData::PartyMemberAvoided { .. } => "trap rolls",
            SimEventData::SpriteRemoved { .. } => "removals",
        };
        *counts.entry(label).or_default() += 1;
    }
    for (label, count) in &counts {
        info!("{}: {}", label, count);
    }

    let hash = state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    info!("=== Verifying Determinism ===");
    let mut replay_state = demo_scene(level, config, objects);
    replay_state.take_events();
    let (replay_final, _) = replay(replay_state, &vec![FRAME_ELAPSED; DEMO_TICKS]);
    let replay_hash = replay_final.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    ensure!(hash == replay_hash, "{} replay diverged", name);
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
