//! Traffic engine: the per-tick driver for all tracked aircraft.
//!
//! `TrafficEngine` owns the hecs ECS world, processes host commands, runs
//! the systems once per host tick, and produces `TrafficSnapshot`s.
//! Headless and deterministic for a given seed and input.

use std::collections::VecDeque;
use std::sync::Arc;

use hecs::{Entity, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use skytrail_core::aircraft::StaticData;
use skytrail_core::commands::EngineCommand;
use skytrail_core::components::AircraftKey;
use skytrail_core::constants::DEFAULT_BUF_PERIOD;
use skytrail_core::events::AircraftEvent;
use skytrail_core::state::TrafficSnapshot;
use skytrail_core::types::TickContext;
use skytrail_phase::profiles::FlightModelTable;
use skytrail_terrain::TerrainProbe;

use crate::provider::FlightDataProvider;
use crate::synthesizer::TrajectorySynthesizer;
use crate::systems;
use crate::world_setup;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed for determinism. Same seed = same light offsets.
    pub seed: u64,
    /// Largest tick gap (s) handled smoothly. Longer gaps, or time running
    /// backwards, re-initialise all aircraft.
    pub buf_period: f64,
    /// Keep landing lights on while taxiing.
    pub landing_lights_taxi: bool,
    /// Let the rules below hide aircraft.
    pub auto_hide: bool,
    pub hide_taxiing: bool,
    /// Hide aircraft lower than this above ground (ft); zero disables.
    pub hide_below_agl_ft: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            buf_period: DEFAULT_BUF_PERIOD,
            landing_lights_taxi: false,
            auto_hide: false,
            hide_taxiing: false,
            hide_below_agl_ft: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// The traffic engine. Owns the ECS world and all per-aircraft state.
pub struct TrafficEngine {
    world: World,
    config: EngineConfig,
    models: FlightModelTable,
    terrain: Box<dyn TerrainProbe>,
    rng: ChaCha8Rng,
    tick: TickContext,
    started: bool,
    command_queue: VecDeque<EngineCommand>,
    despawn_buffer: Vec<Entity>,
    events: Vec<AircraftEvent>,
}

impl TrafficEngine {
    pub fn new(config: EngineConfig, models: FlightModelTable, terrain: Box<dyn TerrainProbe>) -> Self {
        Self {
            world: World::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            models,
            terrain,
            tick: TickContext::default(),
            started: false,
            command_queue: VecDeque::new(),
            despawn_buffer: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue a host command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: EngineCommand) {
        self.command_queue.push_back(command);
    }

    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = EngineCommand>) {
        self.command_queue.extend(commands);
    }

    /// Start tracking an aircraft fed by `provider`. The flight model is
    /// resolved once from the aircraft type.
    pub fn add_aircraft(
        &mut self,
        key: impl Into<String>,
        static_data: &StaticData,
        provider: Arc<dyn FlightDataProvider>,
    ) -> Entity {
        let key = key.into();
        if let Some(old) = world_setup::find_aircraft(&self.world, &key) {
            warn!(aircraft = %key, "aircraft already tracked, replacing it");
            let _ = self.world.despawn(old);
        }

        let model = self.models.resolve(&static_data.aircraft_type);
        let light_offset = self.rng.gen_range(0.0..10.0);
        let synth = TrajectorySynthesizer::new(key.clone(), static_data, model.clone(), light_offset);
        let label = synth.label().to_string();

        info!(aircraft = %key, label = %label, model = %model.name, "aircraft created");
        self.events.push(AircraftEvent::Spawned {
            key: key.clone(),
            label,
        });
        world_setup::spawn_aircraft(&mut self.world, AircraftKey(key), synth, provider)
    }

    /// Drop an aircraft right away. Returns `false` if it is not tracked.
    pub fn remove_aircraft(&mut self, key: &str) -> bool {
        let Some(entity) = world_setup::find_aircraft(&self.world, key) else {
            return false;
        };
        let _ = self.world.despawn(entity);
        info!(aircraft = %key, "aircraft removed");
        self.events.push(AircraftEvent::Removed {
            key: key.to_string(),
        });
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        world_setup::find_aircraft(&self.world, key).is_some()
    }

    /// Advance every aircraft to `sim_time` and return the resulting
    /// snapshot. `elapsed` is real time since start, for reference only.
    pub fn tick(&mut self, sim_time: f64, elapsed: f64) -> TrafficSnapshot {
        self.process_commands();

        if self.started {
            self.tick = self.tick.next(sim_time, elapsed);
            if !self.tick.is_linear(self.config.buf_period) {
                warn!(
                    diff_time = self.tick.diff_time,
                    buf_period = self.config.buf_period,
                    aircraft = self.aircraft_count(),
                    "simulated time jumped, re-initialising all aircraft"
                );
                for key in world_setup::despawn_all(&mut self.world) {
                    self.events.push(AircraftEvent::Removed { key });
                }
            }
        } else {
            self.tick = TickContext {
                sim_time,
                elapsed,
                viewer: self.tick.viewer,
                ..Default::default()
            };
            self.started = true;
        }

        self.run_systems();
        systems::snapshot::build_snapshot(&self.world, &self.tick)
    }

    /// Events gathered since the last call.
    pub fn take_events(&mut self) -> Vec<AircraftEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Timing of the last tick.
    pub fn tick_context(&self) -> &TickContext {
        &self.tick
    }

    pub fn aircraft_count(&self) -> usize {
        self.world.len() as usize
    }

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::SetVisible { key, visible } => {
                if let Some(mut synth) = self.synthesizer_mut(&key) {
                    synth.set_visible(visible);
                }
            }
            EngineCommand::SetAutoVisible { key } => {
                let config = self.config.clone();
                if let Some(mut synth) = self.synthesizer_mut(&key) {
                    synth.set_auto_visible(&config);
                }
            }
            EngineCommand::RemoveAircraft { key } => {
                self.remove_aircraft(&key);
            }
            EngineCommand::SetViewer { viewer } => {
                self.tick.viewer = viewer;
            }
            EngineCommand::SetCameraView { key } => {
                for (_entity, (ac_key, synth)) in self
                    .world
                    .query_mut::<(&AircraftKey, &mut TrajectorySynthesizer)>()
                {
                    synth.set_camera_view(key.as_deref() == Some(ac_key.0.as_str()));
                }
            }
        }
    }

    fn synthesizer_mut(&self, key: &str) -> Option<hecs::RefMut<'_, TrajectorySynthesizer>> {
        let entity = world_setup::find_aircraft(&self.world, key)?;
        self.world.get::<&mut TrajectorySynthesizer>(entity).ok()
    }

    /// Run all systems in order.
    fn run_systems(&mut self) {
        // 1. Trajectories (positions, phases, surfaces)
        systems::trajectory::run(
            &mut self.world,
            &self.tick,
            self.terrain.as_ref(),
            &self.config,
            &mut self.events,
        );
        // 2. Cleanup (invalid aircraft)
        systems::cleanup::run(&mut self.world, &mut self.despawn_buffer, &mut self.events);
    }
}
