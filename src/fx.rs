//! Particle plans for the celebration confetti and the charge sparks.
//! Pure data; `scene` turns these into entities.

use crate::reward::RandomSource;

pub const CONFETTI_COUNT: usize = 200;
pub const CONFETTI_LIFETIME: f32 = 5.0;
/// Gold, goldenrod, bright gold.
pub const CONFETTI_COLORS: [[f32; 3]; 3] = [
    [1.0, 0.843, 0.0],
    [0.855, 0.647, 0.125],
    [0.992, 0.725, 0.192],
];

pub const SPARK_COUNT: usize = 30;
pub const SPARK_PERIOD: f32 = 1.5;
pub const SPARK_REACH: f32 = 300.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Burst {
    /// Share of the total particle count, in percent.
    pub percent: usize,
    /// Cone width in degrees, centred straight up.
    pub spread: f32,
    pub start_velocity: f32,
    /// Per-tick velocity multiplier.
    pub decay: f32,
    pub scalar: f32,
}

impl Burst {
    const fn new(percent: usize, spread: f32) -> Self {
        Self {
            percent,
            spread,
            start_velocity: 45.0,
            decay: 0.9,
            scalar: 1.0,
        }
    }

    pub fn particles(&self, total: usize) -> usize {
        total * self.percent / 100
    }
}

pub const BURSTS: [Burst; 5] = [
    Burst {
        start_velocity: 55.0,
        ..Burst::new(25, 26.0)
    },
    Burst::new(20, 60.0),
    Burst {
        decay: 0.91,
        scalar: 0.8,
        ..Burst::new(35, 100.0)
    },
    Burst {
        start_velocity: 25.0,
        decay: 0.92,
        scalar: 1.2,
        ..Burst::new(10, 120.0)
    },
    Burst::new(10, 120.0),
];

/// One confetti piece at launch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfettiPiece {
    pub velocity: [f32; 2],
    pub decay: f32,
    pub size: f32,
    /// Index into `CONFETTI_COLORS`.
    pub color: usize,
    pub spin: f32,
}

pub fn confetti(rng: &mut impl RandomSource) -> Vec<ConfettiPiece> {
    let mut pieces = Vec::with_capacity(CONFETTI_COUNT);
    for burst in BURSTS {
        for _ in 0..burst.particles(CONFETTI_COUNT) {
            let half = burst.spread.to_radians() / 2.0;
            let angle = std::f32::consts::FRAC_PI_2 + (rng.next_unit() as f32 * 2.0 - 1.0) * half;
            // velocity jitter keeps each burst from looking like a ring
            let speed = burst.start_velocity * (0.5 + rng.next_unit() as f32 * 0.5);
            pieces.push(ConfettiPiece {
                velocity: [angle.cos() * speed, angle.sin() * speed],
                decay: burst.decay,
                size: 10.0 * burst.scalar,
                color: rng.pick_index(CONFETTI_COLORS.len()),
                spin: (rng.next_unit() as f32 - 0.5) * 12.0,
            });
        }
    }
    pieces
}

/// Charge spark: flies from the envelope centre to `target` and loops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparkPlan {
    pub target: [f32; 2],
    pub delay: f32,
}

pub fn sparks(rng: &mut impl RandomSource) -> Vec<SparkPlan> {
    (0..SPARK_COUNT)
        .map(|_| SparkPlan {
            target: [
                (rng.next_unit() as f32 - 0.5) * SPARK_REACH,
                (rng.next_unit() as f32 - 0.5) * SPARK_REACH,
            ],
            delay: rng.next_unit() as f32,
        })
        .collect()
}

/// Spark scale/opacity over its cycle: 0 -> 1 -> 0.
pub fn spark_envelope(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (2.0 * p - 1.0).abs()
}
