//! Particle effects and the proton beam glow.
//!
//! The emitter owns every particle it spawns. Particles are simulated one
//! frame at a time and dropped when their life runs out; nothing outside the
//! emitter holds on to them. The per-frame constants (speeds, friction,
//! gravity) were tuned against a 16 ms frame, so a longer frame is simulated
//! as a proportional number of reference frames.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};
use std::time::Duration;

use crate::config::{EffectSettings, FeedbackConfig};

const PACK_HEIGHT_RATIO: f32 = 0.8;
const BEAM_FADE_PER_FRAME: f32 = 0.05;
const BEAM_PULSE_PER_FRAME: f32 = 0.1;
const BEAM_SHED_CHANCE: f32 = 0.3;
const SUCTION_COUNT: usize = 30;
const FAIL_COUNT: usize = 20;

/// Logical screen coordinates, origin top-left, y down.
pub type ScreenPoint = Vec2;

/// `0xRRGGBB` palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorToken(pub u32);

impl ColorToken {
    pub const SLIME: ColorToken = ColorToken(0x92F428);
    pub const ALARM: ColorToken = ColorToken(0xF44336);

    pub fn to_color(self) -> Color {
        let [_, r, g, b] = self.0.to_be_bytes();
        Color::srgb_u8(r, g, b)
    }
}

/// Screen positions the host resolves once and keeps current.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct EffectAnchors {
    pub center: ScreenPoint,
    pub ghost: ScreenPoint,
    pub pack: ScreenPoint,
}

impl EffectAnchors {
    pub fn for_screen(size: Vec2) -> Self {
        let center = size / 2.0;
        Self {
            center,
            ghost: center,
            pack: Vec2::new(center.x, size.y * PACK_HEIGHT_RATIO),
        }
    }
}

impl Default for EffectAnchors {
    fn default() -> Self {
        Self::for_screen(EffectSettings::default().screen_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CelebrationKind {
    GhostCaptured,
    Ecto1Unlocked,
    InventoryFull,
}

struct Burst {
    count: usize,
    colors: &'static [ColorToken],
    size: (f32, f32),
    speed: (f32, f32),
    life_ms: (f32, f32),
    gravity: f32,
    spread_deg: f32,
}

impl CelebrationKind {
    fn burst(self) -> Burst {
        match self {
            CelebrationKind::GhostCaptured => Burst {
                count: 50,
                colors: &[
                    ColorToken(0x92F428),
                    ColorToken(0x4CAF50),
                    ColorToken(0x8BC34A),
                    ColorToken(0xCDDC39),
                ],
                size: (3.0, 8.0),
                speed: (2.0, 6.0),
                life_ms: (1000.0, 2000.0),
                gravity: 0.1,
                spread_deg: 360.0,
            },
            CelebrationKind::Ecto1Unlocked => Burst {
                count: 80,
                colors: &[
                    ColorToken(0xFFD700),
                    ColorToken(0xFFA500),
                    ColorToken(0xFF6347),
                    ColorToken(0xFF4500),
                ],
                size: (4.0, 12.0),
                speed: (3.0, 8.0),
                life_ms: (1500.0, 3000.0),
                gravity: 0.05,
                spread_deg: 360.0,
            },
            CelebrationKind::InventoryFull => Burst {
                count: 30,
                colors: &[ColorToken(0xFF9800), ColorToken(0xFF5722), ColorToken(0xF44336)],
                size: (2.0, 6.0),
                speed: (1.0, 4.0),
                life_ms: (800.0, 1500.0),
                gravity: 0.15,
                spread_deg: 180.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Celebration,
    Suction,
    Beam,
    Failure,
}

/// Quadratic Bézier flight used by suction particles.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Flight {
    start: Vec2,
    control: Vec2,
    end: Vec2,
    progress: f32,
    speed: f32,
}

impl Flight {
    fn point(&self) -> Vec2 {
        let t = self.progress.min(1.0);
        let inv = 1.0 - t;
        self.start * (inv * inv) + self.control * (2.0 * inv * t) + self.end * (t * t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: ColorToken,
    pub size: f32,
    pub rotation: f32,
    pub remaining_life_ms: f32,
    max_life_ms: f32,
    spin: f32,
    gravity: f32,
    friction: f32,
    flight: Option<Flight>,
}

impl Particle {
    fn ballistic(kind: ParticleKind, position: Vec2, velocity: Vec2, color: ColorToken) -> Self {
        Self {
            kind,
            position,
            velocity,
            color,
            size: 1.0,
            rotation: 0.0,
            remaining_life_ms: 0.0,
            max_life_ms: 0.0,
            spin: 0.0,
            gravity: 0.0,
            friction: 1.0,
            flight: None,
        }
    }

    fn with_life(mut self, life_ms: f32) -> Self {
        self.remaining_life_ms = life_ms;
        self.max_life_ms = life_ms;
        self
    }

    fn update(&mut self, frames: f32, dt_ms: f32) {
        if let Some(flight) = self.flight.as_mut() {
            flight.progress += flight.speed * frames;
            self.position = flight.point();
            return;
        }
        self.position += self.velocity * frames;
        self.velocity.y += self.gravity * frames;
        self.velocity *= self.friction.powf(frames);
        self.rotation += self.spin * frames;
        self.remaining_life_ms -= dt_ms;
    }

    pub fn is_dead(&self) -> bool {
        match self.flight {
            Some(flight) => flight.progress >= 1.0,
            None => self.remaining_life_ms <= 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        match self.flight {
            Some(flight) => (1.0 - flight.progress).clamp(0.0, 1.0),
            None if self.max_life_ms > 0.0 => {
                (self.remaining_life_ms / self.max_life_ms).clamp(0.0, 1.0)
            }
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtonBeam {
    pub intensity: f32,
    pub target: f32,
    pub pulse_phase: f32,
    remove_at: Option<Duration>,
}

impl ProtonBeam {
    /// Opacity of the beam body this frame.
    pub fn alpha(&self) -> f32 {
        self.intensity * (self.pulse_phase.sin() * 0.3 + 0.7)
    }
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum EffectRequest {
    Celebration { at: ScreenPoint, kind: CelebrationKind },
    Suction { from: ScreenPoint, to: ScreenPoint },
    BeamStart,
    BeamStop,
    CaptureFail { at: ScreenPoint },
    ClearAll,
}

/// An effect to fire once `after` has passed.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEffect {
    pub after: Duration,
    pub request: EffectRequest,
}

#[derive(Resource)]
pub struct VisualEffects {
    settings: EffectSettings,
    center: Vec2,
    rng: StdRng,
    particles: Vec<Particle>,
    beam: Option<ProtonBeam>,
    scheduled: Vec<(Duration, EffectRequest)>,
    running: bool,
}

impl VisualEffects {
    pub fn new(settings: EffectSettings) -> Self {
        Self {
            settings,
            center: settings.screen_size / 2.0,
            rng: StdRng::seed_from_u64(settings.seed),
            particles: Vec::new(),
            beam: None,
            scheduled: Vec::new(),
            running: false,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn beam(&self) -> Option<&ProtonBeam> {
        self.beam.as_ref()
    }

    /// Whether the frame loop has anything left to simulate.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn apply(&mut self, now: Duration, request: EffectRequest) {
        match request {
            EffectRequest::Celebration { at, kind } => self.celebration(at, kind),
            EffectRequest::Suction { from, to } => self.suction(from, to),
            EffectRequest::BeamStart => self.proton_beam_start(),
            EffectRequest::BeamStop => self.proton_beam_stop(now),
            EffectRequest::CaptureFail { at } => self.capture_fail(at),
            EffectRequest::ClearAll => self.clear_all(),
        }
    }

    pub fn schedule(&mut self, at: Duration, request: EffectRequest) {
        self.scheduled.push((at, request));
        self.running = true;
    }

    pub fn celebration(&mut self, at: ScreenPoint, kind: CelebrationKind) {
        if self.settings.reduced_motion {
            return;
        }
        let burst = kind.burst();
        let half_spread = burst.spread_deg.to_radians() / 2.0;
        for _ in 0..burst.count {
            let jitter =
                Vec2::new(self.rng.gen_range(-25.0..25.0), self.rng.gen_range(-25.0..25.0));
            let angle = -PI / 2.0 + self.rng.gen_range(-half_spread..=half_spread);
            let speed = self.rng.gen_range(burst.speed.0..burst.speed.1);
            let color = burst.colors[self.rng.gen_range(0..burst.colors.len())];
            let mut particle = Particle::ballistic(
                ParticleKind::Celebration,
                at + jitter,
                Vec2::from_angle(angle) * speed,
                color,
            )
            .with_life(self.rng.gen_range(burst.life_ms.0..burst.life_ms.1));
            particle.size = self.rng.gen_range(burst.size.0..burst.size.1);
            particle.rotation = self.rng.gen_range(0.0..TAU);
            particle.spin = self.rng.gen_range(-0.1..0.1);
            particle.gravity = burst.gravity;
            particle.friction = 0.99;
            self.particles.push(particle);
        }
        self.running = true;
    }

    /// Particles drawn from the ghost at `from` into the pack at `to`.
    pub fn suction(&mut self, from: ScreenPoint, to: ScreenPoint) {
        if self.settings.reduced_motion {
            return;
        }
        for _ in 0..SUCTION_COUNT {
            let start =
                from + Vec2::new(self.rng.gen_range(-15.0..15.0), self.rng.gen_range(-15.0..15.0));
            let control = (start + to) / 2.0
                + Vec2::new(self.rng.gen_range(-50.0..50.0), self.rng.gen_range(-50.0..50.0));
            let mut particle =
                Particle::ballistic(ParticleKind::Suction, start, Vec2::ZERO, ColorToken::SLIME);
            particle.size = self.rng.gen_range(2.0..6.0);
            particle.flight = Some(Flight {
                start,
                control,
                end: to,
                progress: 0.0,
                speed: self.rng.gen_range(0.02..0.05),
            });
            self.particles.push(particle);
        }
        self.running = true;
    }

    pub fn proton_beam_start(&mut self) {
        self.beam =
            Some(ProtonBeam { intensity: 0.0, target: 1.0, pulse_phase: 0.0, remove_at: None });
        self.running = true;
    }

    pub fn proton_beam_stop(&mut self, now: Duration) {
        if let Some(beam) = self.beam.as_mut() {
            beam.target = 0.0;
            beam.remove_at = Some(now + self.settings.beam_linger);
        }
    }

    pub fn capture_fail(&mut self, at: ScreenPoint) {
        if self.settings.reduced_motion {
            return;
        }
        for _ in 0..FAIL_COUNT {
            let angle = self.rng.gen_range(0.0..TAU);
            let speed = self.rng.gen_range(2.0..6.0);
            let velocity = Vec2::from_angle(angle) * speed;
            let mut particle =
                Particle::ballistic(ParticleKind::Failure, at, velocity, ColorToken::ALARM)
                    .with_life(self.rng.gen_range(800.0..1200.0));
            particle.size = self.rng.gen_range(3.0..8.0);
            particle.friction = 0.95;
            self.particles.push(particle);
        }
        self.running = true;
    }

    pub fn clear_all(&mut self) {
        self.particles.clear();
        self.beam = None;
        self.scheduled.clear();
        self.running = false;
    }

    /// Simulates one frame of length `dt` ending at `now`.
    pub fn step(&mut self, now: Duration, dt: Duration) {
        if !self.running {
            return;
        }

        let mut due = Vec::new();
        self.scheduled.retain(|(at, request)| {
            if *at <= now {
                due.push(*request);
                false
            } else {
                true
            }
        });
        for request in due {
            self.apply(now, request);
        }

        let dt_ms = dt.as_secs_f32() * 1000.0;
        let frames = dt.as_secs_f32() / self.settings.frame.as_secs_f32();

        self.particles.retain_mut(|p| {
            p.update(frames, dt_ms);
            !p.is_dead()
        });

        if let Some(beam) = self.beam.as_mut() {
            let fade = BEAM_FADE_PER_FRAME * frames;
            if beam.intensity < beam.target {
                beam.intensity = (beam.intensity + fade).min(beam.target);
            } else if beam.intensity > beam.target {
                beam.intensity = (beam.intensity - fade).max(beam.target);
            }
            beam.pulse_phase += BEAM_PULSE_PER_FRAME * frames;
            let lit = beam.intensity > 0.0;
            if beam.remove_at.is_some_and(|at| now >= at) {
                self.beam = None;
            } else if lit
                && !self.settings.reduced_motion
                && self.rng.gen::<f32>() < BEAM_SHED_CHANCE
            {
                self.shed_beam_particle();
            }
        }

        if self.particles.is_empty() && self.beam.is_none() && self.scheduled.is_empty() {
            self.running = false;
            debug!("effects loop idle");
        }
    }

    fn shed_beam_particle(&mut self) {
        let offset = Vec2::new(self.rng.gen_range(-10.0..10.0), self.rng.gen_range(-50.0..50.0));
        let velocity = Vec2::new(self.rng.gen_range(-1.0..1.0), self.rng.gen_range(-1.0..1.0));
        let origin = self.center + offset;
        let mut particle =
            Particle::ballistic(ParticleKind::Beam, origin, velocity, ColorToken::SLIME)
                .with_life(self.rng.gen_range(500.0..1000.0));
        particle.size = self.rng.gen_range(1.0..4.0);
        particle.friction = 0.98;
        self.particles.push(particle);
    }
}

pub fn run_effects(
    time: Res<Time>,
    mut effects: ResMut<VisualEffects>,
    mut requests: EventReader<EffectRequest>,
    mut delayed: EventReader<ScheduleEffect>,
) {
    let now = time.elapsed();
    for request in requests.read() {
        effects.apply(now, *request);
    }
    for ScheduleEffect { after, request } in delayed.read() {
        effects.schedule(now + *after, *request);
    }
    effects.step(now, time.delta());
}

pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<FeedbackConfig>()
            .map(|c| c.effects)
            .unwrap_or_default();
        app.insert_resource(VisualEffects::new(settings))
            .insert_resource(EffectAnchors::for_screen(settings.screen_size))
            .add_event::<EffectRequest>()
            .add_event::<ScheduleEffect>()
            .add_systems(Update, run_effects.in_set(crate::FeedbackSet::Effects));
    }
}
