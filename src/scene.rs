//! Bevy front end. Draws the envelope, forwards session events, and wires up
//! sounds, confetti, music, clipboard and sharing.

use bevy::{
    asset::LoadState,
    audio::{AudioSinkPlayback, PlaybackMode, Volume},
    prelude::*,
    render::mesh::{Indices, PrimitiveTopology},
    window::PrimaryWindow,
};

use crate::clipboard::{CopyNotice, SystemClipboard};
use crate::config::{GachaConfig, MUSIC_VOLUME};
use crate::fx::{self, CONFETTI_LIFETIME, SPARK_PERIOD};
use crate::reward::{RewardKind, RewardOutcome, SeededSource};
use crate::session::{Session, SessionEvent, SessionState, Timing};
use crate::share::{build_share_url, short_address, ShareMessageSet};

// SETTINGS
pub const WINDOW_WIDTH: f32 = 900.0;
pub const WINDOW_HEIGHT: f32 = 900.0;

// COLORS
const BG_COLOR: Color = Color::srgb(0.72, 0.08, 0.1);
const ENVELOPE_RED: Color = Color::srgb(0.86, 0.07, 0.1);
const ENVELOPE_GOLD: Color = Color::srgb(1.0, 0.8, 0.22);
const SPARK_YELLOW: Color = Color::srgb(0.99, 0.88, 0.28);
const GOOD_GLOW: Color = Color::srgba(0.99, 0.88, 0.28, 0.6);
const BAD_GLOW: Color = Color::srgba(0.82, 0.84, 0.86, 0.6);
const TEXT_GOLD: Color = Color::srgb(1.0, 0.85, 0.1);
const TEXT_SOFT: Color = Color::srgba(1.0, 1.0, 1.0, 0.75);
const COPIED_GREEN: Color = Color::srgb(0.3, 0.9, 0.45);

// Sizes
const ENVELOPE_W: f32 = 240.0;
const ENVELOPE_H: f32 = 340.0;
const ENVELOPE_Y: f32 = 40.0;
const HOVER_SCALE: f32 = 1.05;
/// How far the flap's V dips below the top edge of the envelope.
const FLAP_DEPTH: f32 = 70.0;
const WOBBLE_DEG: f32 = 2.0;
const WOBBLE_HZ: f32 = 5.0;
const HALO_PERIOD: f32 = 2.0;
const REWARD_SIZE: f32 = 300.0;
const CLAP_SIZE: f32 = 200.0;
const CLAP_OFFSET: f32 = 300.0;
const CLAP_FRAME_SECS: f32 = 0.3;
const CONTRACT_Y: f32 = -330.0;
const CONTRACT_HALF_W: f32 = 230.0;
const CONTRACT_HALF_H: f32 = 18.0;

// Confetti speeds are in px per frame at this rate.
const CONFETTI_FPS: f32 = 60.0;
const CONFETTI_FALL: f32 = 3.0;
const CONFETTI_ORIGIN_Y: f32 = -WINDOW_HEIGHT * 0.2;

const CLAP_VOLUME: f32 = 0.8;

pub struct HongbaoPlugin {
    config: GachaConfig,
}

impl HongbaoPlugin {
    pub fn new(config: GachaConfig) -> Self {
        Self { config }
    }
}

impl Plugin for HongbaoPlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone();
        let session = Session::new(
            config.rewards.clone(),
            Timing::default(),
            SeededSource::from_seed_option(config.seed),
        );
        let fx_rng = SeededSource::from_seed_option(config.seed.map(|s| s.wrapping_add(1)));

        app.insert_resource(ClearColor(BG_COLOR))
            .insert_resource(EnvelopeSession(session))
            .insert_resource(FxRng(fx_rng))
            .insert_resource(MusicMuted(config.start_muted))
            .insert_resource(Gacha {
                share: ShareMessageSet::new(config.contract_address.clone()),
                config,
            })
            .init_resource::<CopyState>()
            .insert_non_send_resource(SystemClipboard::default())
            .add_event::<EnvelopeEvent>()
            .add_systems(Startup, (setup, setup_audio))
            .add_systems(
                Update,
                (
                    (click_envelope, handle_keys, drive_session).chain(),
                    (charge_effects, show_reward, celebrate, play_cues),
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    animate_envelope,
                    animate_sparks,
                    animate_confetti,
                    animate_reward,
                    animate_claps,
                    update_texts,
                    sync_music,
                    warn_failed_assets,
                ),
            );
    }
}

// Components
#[derive(Component)]
struct Envelope;
#[derive(Component)]
struct EnvelopeFlash;
#[derive(Component)]
struct Halo;
#[derive(Component)]
struct Spark {
    target: Vec2,
    delay: f32,
    age: f32,
}
#[derive(Component)]
struct Confetti {
    dir: Vec2,
    speed: f32,
    decay: f32,
    spin: f32,
    age: f32,
}
#[derive(Component, Default)]
struct RewardDisplay {
    age: f32,
}
#[derive(Component)]
struct RewardArt;
#[derive(Component)]
struct RewardGlow;
#[derive(Component)]
struct Clap {
    side: f32,
    age: f32,
}
#[derive(Component, Clone, Copy, PartialEq, Debug)]
enum UiText {
    Hint,
    Controls,
    Contract,
    Copied,
}

// Audio markers
#[derive(Component)]
struct BgMusic;

// Resources
#[derive(Resource)]
pub struct EnvelopeSession(pub Session<SeededSource>);

#[derive(Resource)]
struct Gacha {
    config: GachaConfig,
    share: ShareMessageSet,
}

/// Randomness for decoration and share picks, separate from the draws.
#[derive(Resource)]
struct FxRng(SeededSource);

#[derive(Resource)]
struct MusicMuted(bool);

#[derive(Resource, Default)]
struct CopyState(CopyNotice);

#[derive(Resource)]
struct GachaSounds {
    clap: Handle<AudioSource>,
    music: Handle<AudioSource>,
}

#[derive(Resource)]
struct ClapFrames {
    frames: [Handle<Image>; 2],
    current: usize,
    timer: f32,
}

#[derive(Resource)]
struct Palette {
    good_glow: Handle<ColorMaterial>,
    bad_glow: Handle<ColorMaterial>,
}

/// Session events, re-published for the render systems.
#[derive(Event, Clone, Debug)]
pub struct EnvelopeEvent(pub SessionEvent);

/// Rim of the envelope body, counter-clockwise from the right edge: rounded
/// corners, with the flap's V cut into the top edge between the two upper
/// corners.
fn envelope_outline(width: f32, height: f32, radius: f32, flap_depth: f32) -> Vec<Vec2> {
    const CORNER_STEPS: usize = 6;
    let hw = width / 2.0;
    let hh = height / 2.0;
    let r = radius.min(hw).min(hh);
    // the notch tip must stay above the centre for the fan to cover the body
    let depth = flap_depth.clamp(0.0, hh * 0.9);

    let corner = |centre: Vec2, from: f32| {
        (0..=CORNER_STEPS).map(move |i| {
            let a = from + i as f32 / CORNER_STEPS as f32 * std::f32::consts::FRAC_PI_2;
            centre + r * Vec2::from_angle(a)
        })
    };

    let mut rim: Vec<Vec2> = corner(Vec2::new(hw - r, hh - r), 0.0).collect();
    if depth > 0.0 {
        rim.push(Vec2::new(0.0, hh - depth));
    }
    rim.extend(corner(Vec2::new(-hw + r, hh - r), std::f32::consts::FRAC_PI_2));
    rim.extend(corner(Vec2::new(-hw + r, -hh + r), std::f32::consts::PI));
    rim.extend(corner(Vec2::new(hw - r, -hh + r), -std::f32::consts::FRAC_PI_2));
    rim
}

/// Envelope body mesh: a triangle fan from the centre over `envelope_outline`.
fn create_envelope_mesh(width: f32, height: f32, radius: f32, flap_depth: f32) -> Mesh {
    let rim = envelope_outline(width, height, radius, flap_depth);
    let uv = |p: Vec2| [p.x / width + 0.5, 0.5 - p.y / height];

    let positions: Vec<[f32; 3]> = std::iter::once(Vec2::ZERO)
        .chain(rim.iter().copied())
        .map(|p| [p.x, p.y, 0.0])
        .collect();
    let uvs: Vec<[f32; 2]> = std::iter::once(Vec2::ZERO)
        .chain(rim.iter().copied())
        .map(uv)
        .collect();

    let n = rim.len() as u32;
    let indices: Vec<u32> = (0..n).flat_map(|i| [0, i + 1, (i + 1) % n + 1]).collect();

    Mesh::new(PrimitiveTopology::TriangleList, default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_indices(Indices::U32(indices))
}

fn setup(
    mut cmd: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<ColorMaterial>>,
    asset_server: Res<AssetServer>,
    gacha: Res<Gacha>,
) {
    cmd.spawn(Camera2d);

    // Title
    cmd.spawn((
        Text2d::new("LUCKY RED ENVELOPE"),
        TextFont {
            font_size: 44.0,
            ..default()
        },
        TextColor(TEXT_GOLD),
        Transform::from_xyz(0.0, 370.0, 10.0),
    ));

    // Halo behind the envelope, only lit while charging
    cmd.spawn((
        Mesh2d(meshes.add(Circle::new(ENVELOPE_H * 0.6))),
        MeshMaterial2d(mats.add(ColorMaterial::from(Color::WHITE.with_alpha(0.0)))),
        Transform::from_xyz(0.0, ENVELOPE_Y, -1.0),
        Halo,
    ));

    // Envelope: fallback body + seal, artwork on top, white flash overlay
    let body = meshes.add(create_envelope_mesh(ENVELOPE_W, ENVELOPE_H, 24.0, FLAP_DEPTH));
    cmd.spawn((
        Mesh2d(body.clone()),
        MeshMaterial2d(mats.add(ColorMaterial::from(ENVELOPE_RED))),
        Transform::from_xyz(0.0, ENVELOPE_Y, 0.0),
        Visibility::Visible,
        Envelope,
    ))
    .with_children(|p| {
        p.spawn((
            Mesh2d(meshes.add(Circle::new(40.0))),
            MeshMaterial2d(mats.add(ColorMaterial::from(ENVELOPE_GOLD))),
            Transform::from_xyz(0.0, 50.0, 0.5),
        ));
        p.spawn((
            Sprite {
                image: asset_server.load("red-envelope.png"),
                custom_size: Some(Vec2::new(ENVELOPE_W, ENVELOPE_H)),
                ..default()
            },
            Transform::from_xyz(0.0, 0.0, 1.0),
        ));
        p.spawn((
            Mesh2d(body),
            MeshMaterial2d(mats.add(ColorMaterial::from(Color::WHITE.with_alpha(0.0)))),
            Transform::from_xyz(0.0, 0.0, 2.0),
            EnvelopeFlash,
        ));
    });

    // Reward display, hidden until a reward shows
    let palette = Palette {
        good_glow: mats.add(ColorMaterial::from(GOOD_GLOW)),
        bad_glow: mats.add(ColorMaterial::from(BAD_GLOW)),
    };
    cmd.spawn((
        Transform::from_xyz(0.0, ENVELOPE_Y, 0.0),
        Visibility::Hidden,
        RewardDisplay::default(),
    ))
    .with_children(|p| {
        p.spawn((
            Mesh2d(meshes.add(Circle::new(REWARD_SIZE * 0.45))),
            MeshMaterial2d(palette.bad_glow.clone()),
            Transform::from_xyz(0.0, 0.0, 0.0),
            RewardGlow,
        ));
        p.spawn((
            Sprite {
                custom_size: Some(Vec2::splat(REWARD_SIZE)),
                ..default()
            },
            Transform::from_xyz(0.0, 0.0, 1.0),
            RewardArt,
        ));
    });
    cmd.insert_resource(palette);

    // Clapping hands either side of a good reward
    let frames = [asset_server.load("clap1.png"), asset_server.load("clap2.png")];
    for side in [-1.0, 1.0] {
        cmd.spawn((
            Sprite {
                image: frames[0].clone(),
                custom_size: Some(Vec2::splat(CLAP_SIZE)),
                flip_x: side > 0.0,
                ..default()
            },
            Transform::from_xyz(side * CLAP_OFFSET, ENVELOPE_Y, 3.0),
            Visibility::Hidden,
            Clap { side, age: 0.0 },
        ));
    }
    cmd.insert_resource(ClapFrames {
        frames,
        current: 0,
        timer: 0.0,
    });

    // Text lines
    let lines = [
        (UiText::Hint, "", 30.0, -190.0, TEXT_GOLD),
        (UiText::Controls, "", 20.0, -260.0, TEXT_SOFT),
        (UiText::Contract, "", 20.0, CONTRACT_Y, TEXT_SOFT),
        (UiText::Copied, "Copied!", 18.0, CONTRACT_Y - 30.0, COPIED_GREEN),
    ];
    for (kind, text, size, y, color) in lines {
        cmd.spawn((
            Text2d::new(text),
            TextFont {
                font_size: size,
                ..default()
            },
            TextColor(color),
            Transform::from_xyz(0.0, y, 10.0),
            Visibility::Hidden,
            kind,
        ));
    }

    info!(
        "Envelope ready, contract {}",
        short_address(&gacha.config.contract_address)
    );
}

fn setup_audio(mut cmd: Commands, asset_server: Res<AssetServer>, muted: Res<MusicMuted>) {
    let sounds = GachaSounds {
        clap: asset_server.load("sounds/clap.ogg"),
        music: asset_server.load("sounds/music.ogg"),
    };

    cmd.spawn((
        AudioPlayer::new(sounds.music.clone()),
        PlaybackSettings {
            mode: PlaybackMode::Loop,
            volume: Volume::new(music_volume(muted.0)),
            ..default()
        },
        BgMusic,
    ));
    cmd.insert_resource(sounds);
}

fn music_volume(muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        MUSIC_VOLUME
    }
}

fn cursor_world(
    windows: &Query<&Window, With<PrimaryWindow>>,
    cam: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let win = windows.get_single().ok()?;
    let (camera, cam_t) = cam.get_single().ok()?;
    let cursor = win.cursor_position()?;
    camera.viewport_to_world_2d(cam_t, cursor).ok()
}

fn over_envelope(world: Vec2, scale: f32) -> bool {
    (world.x).abs() <= ENVELOPE_W * scale / 2.0
        && (world.y - ENVELOPE_Y).abs() <= ENVELOPE_H * scale / 2.0
}

/// Hit test against the envelope at the size it is currently drawn, so
/// hover and click always agree.
fn envelope_under_cursor(world: Vec2, envelope: &Transform) -> bool {
    over_envelope(world, envelope.scale.x)
}

fn over_reward(world: Vec2) -> bool {
    world.distance(Vec2::new(0.0, ENVELOPE_Y)) <= REWARD_SIZE / 2.0
}

fn over_contract_line(world: Vec2) -> bool {
    world.x.abs() <= CONTRACT_HALF_W && (world.y - CONTRACT_Y).abs() <= CONTRACT_HALF_H
}

fn click_envelope(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cam: Query<(&Camera, &GlobalTransform)>,
    envelope: Query<&Transform, With<Envelope>>,
    mut session: ResMut<EnvelopeSession>,
    mut copy: ResMut<CopyState>,
    mut clipboard: NonSendMut<SystemClipboard>,
    gacha: Res<Gacha>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(world) = cursor_world(&windows, &cam) else {
        return;
    };

    match session.0.state() {
        SessionState::Idle => {
            if envelope
                .get_single()
                .is_ok_and(|t| envelope_under_cursor(world, t))
            {
                session.0.click();
            } else if over_contract_line(world) {
                copy.0
                    .copy(&mut *clipboard, &gacha.config.contract_address);
            }
        }
        // hit target is disabled until the reveal
        SessionState::Charging => {}
        SessionState::Revealed => {
            if session.0.visible_outcome().is_some() && over_reward(world) {
                session.0.click();
            }
        }
    }
}

fn handle_keys(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut session: ResMut<EnvelopeSession>,
    mut copy: ResMut<CopyState>,
    mut clipboard: NonSendMut<SystemClipboard>,
    mut muted: ResMut<MusicMuted>,
    mut fx_rng: ResMut<FxRng>,
    gacha: Res<Gacha>,
) {
    let state = session.0.state();

    if keyboard.just_pressed(KeyCode::Space) && state == SessionState::Idle {
        session.0.click();
    }

    if keyboard.just_pressed(KeyCode::KeyR) && state == SessionState::Revealed {
        session.0.reset();
    }

    if keyboard.just_pressed(KeyCode::KeyS) {
        if let Some(outcome) = session.0.visible_outcome() {
            open_share_link(&gacha, &mut fx_rng.0, outcome.kind);
        }
    }

    if keyboard.just_pressed(KeyCode::KeyC) && state == SessionState::Idle {
        copy.0
            .copy(&mut *clipboard, &gacha.config.contract_address);
    }

    if keyboard.just_pressed(KeyCode::KeyM) {
        muted.0 = !muted.0;
        info!("Music {}", if muted.0 { "muted" } else { "unmuted" });
    }
}

fn open_share_link(gacha: &Gacha, rng: &mut SeededSource, kind: RewardKind) {
    let message = gacha.share.pick_share_message(kind, rng);
    let url = build_share_url(&gacha.config.share_endpoint, &message);
    info!("Opening share link {}", url);
    if let Err(e) = webbrowser::open(url.as_str()) {
        warn!("Failed to open share link: {}", e);
    }
}

fn drive_session(
    time: Res<Time>,
    mut session: ResMut<EnvelopeSession>,
    mut copy: ResMut<CopyState>,
    mut events: EventWriter<EnvelopeEvent>,
) {
    copy.0.tick(time.delta());
    for event in session.0.tick(time.delta()) {
        events.send(EnvelopeEvent(event));
    }
}

fn charge_effects(
    mut cmd: Commands,
    mut events: EventReader<EnvelopeEvent>,
    mut fx_rng: ResMut<FxRng>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<ColorMaterial>>,
    sparks: Query<Entity, With<Spark>>,
) {
    for EnvelopeEvent(event) in events.read() {
        match event {
            SessionEvent::ChargeStarted => {
                let mesh = meshes.add(Circle::new(4.0));
                let mat = mats.add(ColorMaterial::from(SPARK_YELLOW));
                for plan in fx::sparks(&mut fx_rng.0) {
                    cmd.spawn((
                        Mesh2d(mesh.clone()),
                        MeshMaterial2d(mat.clone()),
                        Transform::from_xyz(0.0, ENVELOPE_Y, 5.0).with_scale(Vec3::ZERO),
                        Spark {
                            target: Vec2::from(plan.target),
                            delay: plan.delay,
                            age: 0.0,
                        },
                    ));
                }
            }
            SessionEvent::Opened(_) | SessionEvent::Reset => {
                for e in sparks.iter() {
                    cmd.entity(e).despawn();
                }
            }
            _ => {}
        }
    }
}

fn show_reward(
    mut cmd: Commands,
    mut events: EventReader<EnvelopeEvent>,
    asset_server: Res<AssetServer>,
    palette: Res<Palette>,
    mut display: Query<(&mut Visibility, &mut RewardDisplay)>,
    mut art: Query<&mut Sprite, With<RewardArt>>,
    mut glow: Query<&mut MeshMaterial2d<ColorMaterial>, With<RewardGlow>>,
    mut claps: Query<(&mut Visibility, &mut Clap), Without<RewardDisplay>>,
    confetti: Query<Entity, With<Confetti>>,
) {
    for EnvelopeEvent(event) in events.read() {
        match event {
            SessionEvent::RewardShown(RewardOutcome { kind, asset_ref }) => {
                for mut sprite in art.iter_mut() {
                    sprite.image = asset_server.load(asset_ref.clone());
                }
                for mut mat in glow.iter_mut() {
                    mat.0 = match kind {
                        RewardKind::Good => palette.good_glow.clone(),
                        RewardKind::Bad => palette.bad_glow.clone(),
                    };
                }
                for (mut vis, mut d) in display.iter_mut() {
                    *vis = Visibility::Visible;
                    d.age = 0.0;
                }
                for (mut vis, mut clap) in claps.iter_mut() {
                    *vis = if kind.is_good() {
                        Visibility::Visible
                    } else {
                        Visibility::Hidden
                    };
                    clap.age = 0.0;
                }
            }
            SessionEvent::Reset => {
                for (mut vis, _) in display.iter_mut() {
                    *vis = Visibility::Hidden;
                }
                for (mut vis, _) in claps.iter_mut() {
                    *vis = Visibility::Hidden;
                }
                for e in confetti.iter() {
                    cmd.entity(e).despawn();
                }
            }
            _ => {}
        }
    }
}

fn celebrate(
    mut cmd: Commands,
    mut events: EventReader<EnvelopeEvent>,
    mut fx_rng: ResMut<FxRng>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<ColorMaterial>>,
) {
    for EnvelopeEvent(event) in events.read() {
        if *event != SessionEvent::Celebrate {
            continue;
        }
        let colors = fx::CONFETTI_COLORS
            .map(|[r, g, b]| mats.add(ColorMaterial::from(Color::srgb(r, g, b))));
        let pieces = fx::confetti(&mut fx_rng.0);
        info!("Celebrating with {} confetti", pieces.len());
        for piece in pieces {
            let v = Vec2::from(piece.velocity);
            cmd.spawn((
                Mesh2d(meshes.add(Rectangle::new(piece.size, piece.size))),
                MeshMaterial2d(colors[piece.color].clone()),
                Transform::from_xyz(0.0, CONFETTI_ORIGIN_Y, 30.0),
                Confetti {
                    dir: v.normalize_or_zero(),
                    speed: v.length(),
                    decay: piece.decay,
                    spin: piece.spin,
                    age: 0.0,
                },
            ));
        }
    }
}

fn play_cues(
    mut cmd: Commands,
    mut events: EventReader<EnvelopeEvent>,
    sounds: Option<Res<GachaSounds>>,
    asset_server: Res<AssetServer>,
) {
    let Some(sounds) = sounds else { return };

    for EnvelopeEvent(event) in events.read() {
        if *event != SessionEvent::CelebrationCue {
            continue;
        }
        // a failed clip would never start and never despawn
        if matches!(
            asset_server.get_load_state(sounds.clap.id()),
            Some(LoadState::Failed(_))
        ) {
            continue;
        }
        cmd.spawn((
            AudioPlayer::new(sounds.clap.clone()),
            PlaybackSettings {
                mode: PlaybackMode::Despawn,
                volume: Volume::new(CLAP_VOLUME),
                ..default()
            },
        ));
    }
}

fn animate_envelope(
    time: Res<Time>,
    session: Res<EnvelopeSession>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cam: Query<(&Camera, &GlobalTransform)>,
    mut envelope: Query<(&mut Transform, &mut Visibility), With<Envelope>>,
    mut halo: Query<(&mut Transform, &MeshMaterial2d<ColorMaterial>), (With<Halo>, Without<Envelope>)>,
    flash: Query<&MeshMaterial2d<ColorMaterial>, With<EnvelopeFlash>>,
    mut mats: ResMut<Assets<ColorMaterial>>,
) {
    let state = session.0.state();
    let glow = session.0.glow();
    let charging = state == SessionState::Charging;
    let t_secs = time.elapsed_secs();

    for (mut t, mut vis) in envelope.iter_mut() {
        *vis = if session.0.visible_outcome().is_some() {
            Visibility::Hidden
        } else {
            Visibility::Visible
        };

        let hovered = state == SessionState::Idle
            && cursor_world(&windows, &cam).is_some_and(|w| envelope_under_cursor(w, &t));
        let target = match state {
            SessionState::Charging => glow.scale,
            SessionState::Idle if hovered => HOVER_SCALE,
            _ => 1.0,
        };
        t.scale = t.scale.lerp(Vec3::splat(target), (12.0 * time.delta_secs()).min(1.0));
        t.rotation = if charging {
            let wobble = (t_secs * WOBBLE_HZ * std::f32::consts::TAU).sin();
            Quat::from_rotation_z(wobble * WOBBLE_DEG.to_radians())
        } else {
            Quat::IDENTITY
        };
    }

    let phase = (t_secs % HALO_PERIOD) / HALO_PERIOD;
    for (mut t, mat) in halo.iter_mut() {
        let (scale, alpha) = if charging {
            (1.0 + 0.6 * phase, 0.1 + 0.3 * phase)
        } else {
            (1.0, 0.0)
        };
        t.scale = Vec3::splat(scale);
        if let Some(m) = mats.get_mut(&mat.0) {
            m.color = m.color.with_alpha(alpha);
        }
    }

    let flash_alpha = if charging {
        ((glow.brightness - 1.0) * 0.5).clamp(0.0, 1.0)
    } else {
        0.0
    };
    for mat in flash.iter() {
        if let Some(m) = mats.get_mut(&mat.0) {
            m.color = m.color.with_alpha(flash_alpha);
        }
    }
}

fn animate_sparks(
    time: Res<Time>,
    session: Res<EnvelopeSession>,
    mut sparks: Query<(&mut Transform, &mut Spark)>,
) {
    let reach = session.0.glow().scale;
    for (mut t, mut s) in sparks.iter_mut() {
        s.age += time.delta_secs();
        if s.age < s.delay {
            continue;
        }
        let progress = ((s.age - s.delay) % SPARK_PERIOD) / SPARK_PERIOD;
        // ease out
        let travel = 1.0 - (1.0 - progress).powi(2);
        let pos = s.target * reach * travel;
        t.translation.x = pos.x;
        t.translation.y = ENVELOPE_Y + pos.y;
        t.scale = Vec3::splat(fx::spark_envelope(progress));
    }
}

fn animate_confetti(
    mut cmd: Commands,
    time: Res<Time>,
    mut pieces: Query<(Entity, &mut Transform, &mut Confetti)>,
) {
    let dt = time.delta_secs();
    let frames = dt * CONFETTI_FPS;

    for (e, mut t, mut c) in pieces.iter_mut() {
        c.age += dt;
        t.translation.x += c.dir.x * c.speed * frames;
        t.translation.y += c.dir.y * c.speed * frames - CONFETTI_FALL * frames;
        c.speed *= c.decay.powf(frames);
        t.rotation = Quat::from_rotation_z(c.age * c.spin);
        // paper flutter
        t.scale.y = (c.age * 6.0 + c.spin).cos().abs().max(0.2);

        if c.age > CONFETTI_LIFETIME || t.translation.y < -WINDOW_HEIGHT / 2.0 - 40.0 {
            cmd.entity(e).despawn();
        }
    }
}

fn animate_reward(
    time: Res<Time>,
    mut display: Query<(&mut Transform, &mut RewardDisplay, &Visibility)>,
    mut glow: Query<&mut Transform, (With<RewardGlow>, Without<RewardDisplay>)>,
) {
    let dt = time.delta_secs();
    for (mut t, mut d, vis) in display.iter_mut() {
        if *vis == Visibility::Hidden {
            continue;
        }
        d.age += dt;
        let pop = (d.age / 0.5).min(1.0);
        t.scale = Vec3::splat(0.8 + 0.2 * pop);
        // -5deg, +5deg, back to rest over the first second
        let sway = if d.age < 1.0 {
            -(d.age * std::f32::consts::TAU).sin() * 5.0
        } else {
            0.0
        };
        t.rotation = Quat::from_rotation_z(sway.to_radians());

        for mut g in glow.iter_mut() {
            let pulse = 1.0 + (d.age * std::f32::consts::PI).sin() * 0.05;
            g.scale = Vec3::splat(pulse);
        }
    }
}

fn animate_claps(
    time: Res<Time>,
    mut frames: ResMut<ClapFrames>,
    mut claps: Query<(&mut Sprite, &mut Transform, &mut Clap, &Visibility)>,
) {
    let dt = time.delta_secs();
    frames.timer += dt;
    if frames.timer >= CLAP_FRAME_SECS {
        frames.timer -= CLAP_FRAME_SECS;
        frames.current = 1 - frames.current;
    }

    for (mut sprite, mut t, mut clap, vis) in claps.iter_mut() {
        if *vis == Visibility::Hidden {
            continue;
        }
        clap.age += dt;
        sprite.image = frames.frames[frames.current].clone();

        let slide = (clap.age / 0.5).min(1.0);
        t.translation.x = clap.side * (CLAP_OFFSET + 50.0 * (1.0 - slide));
        let swing = (clap.age * std::f32::consts::TAU).sin();
        t.rotation = Quat::from_rotation_z((swing * 5.0).to_radians());
        t.scale = Vec3::splat(1.0 + 0.05 * (1.0 - (clap.age * std::f32::consts::TAU).cos()));
        sprite.color = Color::WHITE.with_alpha(slide);
    }
}

fn hint_text(state: SessionState, shown: Option<&RewardOutcome>) -> &'static str {
    match (state, shown.map(|o| o.kind)) {
        (SessionState::Idle, _) => "Click the envelope to try your luck!",
        (SessionState::Charging, _) => "Charging up...",
        (SessionState::Revealed, Some(RewardKind::Good)) => "Congratulations!",
        (SessionState::Revealed, Some(RewardKind::Bad)) => "Better luck next time...",
        (SessionState::Revealed, None) => "",
    }
}

fn controls_text(state: SessionState, shown: Option<&RewardOutcome>, muted: bool) -> String {
    let music = if muted { "[M] Music off" } else { "[M] Music on" };
    match (state, shown.map(|o| o.kind)) {
        (SessionState::Idle, _) => format!("[Space] Open   [C] Copy contract   {music}"),
        (SessionState::Revealed, Some(RewardKind::Good)) => {
            format!("[R] Try Your Luck Again!   [S] Share   {music}")
        }
        (SessionState::Revealed, Some(RewardKind::Bad)) => {
            format!("[R] Try Again   [S] Share   {music}")
        }
        _ => music.to_string(),
    }
}

fn update_texts(
    session: Res<EnvelopeSession>,
    copy: Res<CopyState>,
    muted: Res<MusicMuted>,
    gacha: Res<Gacha>,
    mut texts: Query<(&UiText, &mut Text2d, &mut Visibility)>,
) {
    let state = session.0.state();
    let shown = session.0.visible_outcome();
    let idle = state == SessionState::Idle;

    for (kind, mut txt, mut vis) in texts.iter_mut() {
        let (text, visible) = match kind {
            UiText::Hint => (hint_text(state, shown).to_string(), true),
            UiText::Controls => (controls_text(state, shown, muted.0), true),
            UiText::Contract => (
                format!(
                    "Contract Address: {}",
                    short_address(&gacha.config.contract_address)
                ),
                idle,
            ),
            UiText::Copied => (txt.0.clone(), idle && copy.0.visible()),
        };
        if txt.0 != text {
            txt.0 = text;
        }
        let want = if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        if *vis != want {
            *vis = want;
        }
    }
}

fn sync_music(muted: Res<MusicMuted>, sinks: Query<&AudioSink, With<BgMusic>>) {
    let target = music_volume(muted.0);
    for sink in sinks.iter() {
        if sink.volume() != target {
            sink.set_volume(target);
        }
    }
}

/// Missing audio only costs the sound; say so once.
fn warn_failed_assets(
    asset_server: Res<AssetServer>,
    sounds: Option<Res<GachaSounds>>,
    mut warned: Local<bool>,
) {
    let Some(sounds) = sounds else { return };
    if *warned {
        return;
    }
    for (name, id) in [("clap", sounds.clap.id()), ("music", sounds.music.id())] {
        if let Some(LoadState::Failed(e)) = asset_server.get_load_state(id) {
            warn!("Failed to load {} audio, continuing without it: {}", name, e);
            *warned = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: RewardKind) -> RewardOutcome {
        RewardOutcome {
            kind,
            asset_ref: "x.png".into(),
        }
    }

    #[test]
    fn hit_targets() {
        assert!(over_envelope(Vec2::new(0.0, ENVELOPE_Y), 1.0));
        assert!(over_envelope(Vec2::new(ENVELOPE_W / 2.0, ENVELOPE_Y), 1.0));
        assert!(!over_envelope(Vec2::new(ENVELOPE_W, ENVELOPE_Y), 1.0));
        assert!(over_envelope(
            Vec2::new(0.0, ENVELOPE_Y + ENVELOPE_H / 2.0 + 5.0),
            HOVER_SCALE
        ));
        assert!(over_contract_line(Vec2::new(100.0, CONTRACT_Y)));
        assert!(!over_contract_line(Vec2::new(0.0, 0.0)));
        assert!(over_reward(Vec2::new(0.0, ENVELOPE_Y + 10.0)));
    }

    #[test]
    fn hover_and_click_share_the_drawn_size() {
        // just outside the resting envelope, inside the hovered one
        let band = Vec2::new(0.0, ENVELOPE_Y + ENVELOPE_H / 2.0 + 5.0);
        assert!(!envelope_under_cursor(band, &Transform::IDENTITY));
        assert!(envelope_under_cursor(
            band,
            &Transform::from_scale(Vec3::splat(HOVER_SCALE))
        ));
    }

    #[test]
    fn envelope_outline_has_a_flap_notch() {
        let hw = ENVELOPE_W / 2.0;
        let hh = ENVELOPE_H / 2.0;
        let rim = envelope_outline(ENVELOPE_W, ENVELOPE_H, 24.0, FLAP_DEPTH);

        assert!(rim.contains(&Vec2::new(0.0, hh - FLAP_DEPTH)));
        for p in &rim {
            assert!(p.x.abs() <= hw + 1e-3 && p.y.abs() <= hh + 1e-3);
        }
        // the top-middle of the rim is the notch tip, not the straight edge
        let top_middle = rim
            .iter()
            .filter(|p| p.x.abs() < 1.0)
            .map(|p| p.y)
            .fold(f32::MIN, f32::max);
        assert_eq!(top_middle, hh - FLAP_DEPTH);

        let flat = envelope_outline(ENVELOPE_W, ENVELOPE_H, 24.0, 0.0);
        assert_eq!(flat.len(), rim.len() - 1);

        // notch depth is capped so the tip stays above the centre
        let deep = envelope_outline(ENVELOPE_W, ENVELOPE_H, 24.0, 1_000.0);
        assert!(deep.contains(&Vec2::new(0.0, hh - hh * 0.9)));
    }

    #[test]
    fn envelope_mesh_fans_over_the_outline() {
        let rim = envelope_outline(ENVELOPE_W, ENVELOPE_H, 24.0, FLAP_DEPTH);
        let mesh = create_envelope_mesh(ENVELOPE_W, ENVELOPE_H, 24.0, FLAP_DEPTH);
        assert_eq!(mesh.count_vertices(), rim.len() + 1);
        assert_eq!(mesh.indices().map(|i| i.len()), Some(rim.len() * 3));
    }

    #[test]
    fn hint_follows_state() {
        assert_eq!(
            hint_text(SessionState::Idle, None),
            "Click the envelope to try your luck!"
        );
        assert_eq!(hint_text(SessionState::Revealed, None), "");
        let good = outcome(RewardKind::Good);
        assert_eq!(
            hint_text(SessionState::Revealed, Some(&good)),
            "Congratulations!"
        );
    }

    #[test]
    fn controls_offer_share_only_after_reveal() {
        assert!(!controls_text(SessionState::Idle, None, false).contains("[S]"));
        assert!(!controls_text(SessionState::Charging, None, false).contains("[S]"));
        let bad = outcome(RewardKind::Bad);
        let text = controls_text(SessionState::Revealed, Some(&bad), true);
        assert!(text.contains("[S] Share"));
        assert!(text.contains("Try Again"));
        assert!(text.contains("Music off"));
    }

    #[test]
    fn muting_silences_music() {
        assert_eq!(music_volume(true), 0.0);
        assert_eq!(music_volume(false), MUSIC_VOLUME);
    }
}
