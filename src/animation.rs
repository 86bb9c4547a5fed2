//! Keyframe playback for the loaded model.
//!
//! An [`AnimationMixer`] plays every clip of one model, looped from t = 0. The
//! [`AnimationDriver`] is the optional slot the render loop steps each tick; it stays
//! empty until a model with clips arrives and is never emptied again.

use cgmath::{InnerSpace, VectorSpace};
use instant::{Duration, Instant};

use crate::{
    data_structures::scene_graph::{NodeId, Scene},
    resources::animation::{AnimationClip, Interpolation, Keyframes, Track},
};

#[derive(Debug)]
struct BoundTrack {
    node: NodeId,
    track: Track,
}

#[derive(Debug)]
struct BoundClip {
    name: String,
    duration: f32,
    tracks: Vec<BoundTrack>,
}

#[derive(Debug)]
pub struct AnimationMixer {
    clips: Vec<BoundClip>,
    time: f32,
}

impl AnimationMixer {
    /// Binds the tracks of `clips` to the nodes below `root` they target.
    ///
    /// Returns `None` when there is nothing to play. Tracks whose node is not in
    /// the sub-tree are dropped with a warning.
    pub fn new(clips: Vec<AnimationClip>, scene: &Scene, root: NodeId) -> Option<Self> {
        let subtree = scene.find(root)?;
        let mut targets = std::collections::HashMap::new();
        subtree.traverse(&mut |node| {
            if let Some(index) = node.source_index {
                targets.entry(index).or_insert(node.id());
            }
        });

        let clips: Vec<BoundClip> = clips
            .into_iter()
            .map(|clip| {
                let tracks = clip
                    .tracks
                    .into_iter()
                    .filter_map(|track| match targets.get(&track.target) {
                        Some(&node) => Some(BoundTrack { node, track }),
                        None => {
                            log::warn!(
                                "clip {} animates node {} which is not part of the model",
                                clip.name,
                                track.target
                            );
                            None
                        }
                    })
                    .collect();
                BoundClip {
                    name: clip.name,
                    duration: clip.duration,
                    tracks,
                }
            })
            .collect();

        if clips.is_empty() {
            return None;
        }
        log::info!(
            "playing {}",
            clips
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Some(Self { clips, time: 0.0 })
    }

    /// Seconds played since the mixer was created.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.clips.iter().map(|c| c.name.as_str())
    }

    pub fn update(&mut self, dt: Duration, scene: &mut Scene) {
        self.time += dt.as_secs_f32();
        for clip in &self.clips {
            let local = if clip.duration > 0.0 {
                self.time % clip.duration
            } else {
                0.0
            };
            for bound in &clip.tracks {
                if let Some(node) = scene.find_mut(bound.node) {
                    apply_track(&bound.track, local, &mut node.transform);
                }
            }
        }
    }
}

/// Index of the last key at or before `t` and the blend factor towards the next one.
fn key_frame(timestamps: &[f32], t: f32) -> (usize, usize, f32) {
    let next = timestamps.partition_point(|&stamp| stamp <= t);
    if next == 0 {
        return (0, 0, 0.0);
    }
    if next >= timestamps.len() {
        let last = timestamps.len() - 1;
        return (last, last, 0.0);
    }
    let prev = next - 1;
    let span = timestamps[next] - timestamps[prev];
    let factor = if span > 0.0 {
        (t - timestamps[prev]) / span
    } else {
        0.0
    };
    (prev, next, factor)
}

fn apply_track(
    track: &Track,
    t: f32,
    transform: &mut crate::data_structures::transform::Transform,
) {
    if track.timestamps.is_empty() {
        return;
    }
    let (prev, next, factor) = key_frame(&track.timestamps, t);
    let factor = match track.interpolation {
        Interpolation::Step => 0.0,
        Interpolation::Linear => factor,
    };
    match &track.keyframes {
        Keyframes::Translation(keys) => {
            transform.position = keys[prev].lerp(keys[next], factor);
        }
        Keyframes::Rotation(keys) => {
            transform.rotation = keys[prev].slerp(keys[next], factor).normalize();
        }
        Keyframes::Scale(keys) => {
            transform.scale = keys[prev].lerp(keys[next], factor);
        }
    }
}

/// Optional mixer slot advanced by the render loop.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    mixer: Option<AnimationMixer>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, mixer: AnimationMixer) {
        if self.mixer.is_some() {
            log::warn!("replacing an already bound animation mixer");
        }
        self.mixer = Some(mixer);
    }

    pub fn is_bound(&self) -> bool {
        self.mixer.is_some()
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    /// Advances the bound mixer by `dt`; does nothing while unbound.
    pub fn step(&mut self, dt: Duration, scene: &mut Scene) {
        if let Some(mixer) = &mut self.mixer {
            mixer.update(dt, scene);
        }
    }
}

/// Monotonic clock sampled once per tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    last: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time since the previous sample; zero on the first one.
    pub fn delta(&mut self, now: Instant) -> Duration {
        let dt = match self.last {
            Some(last) if now > last => now - last,
            _ => Duration::ZERO,
        };
        self.last = Some(now);
        dt
    }
}
