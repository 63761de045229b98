//! Pose data consumed by the sampler.
//!
//! The session treats a pose as a list of named bones with a local rotation
//! each. Where that data comes from is up to the [`PoseSource`].

use std::collections::BTreeMap;
use std::ops::Neg;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

/// A rotation quaternion, scalar part first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy. A zero or non-finite norm yields the identity.
    pub fn normalized(self) -> Self {
        let norm = self.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Self::IDENTITY;
        }
        Self::new(self.w / norm, self.x / norm, self.y / norm, self.z / norm)
    }

    /// Unit quaternion with a non-negative scalar part.
    ///
    /// `q` and `-q` are the same rotation, so fixing the sign of `w` lets the
    /// receiver rebuild it from the vector part alone.
    pub fn canonical(self) -> Self {
        let q = self.normalized();
        if q.w < 0.0 {
            -q
        } else {
            q
        }
    }

    /// The transmitted `local_rot` triple: vector part of the canonical form.
    pub fn local_rot(self) -> [f64; 3] {
        let q = self.canonical();
        [q.x, q.y, q.z]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Neg for Quaternion {
    type Output = Quaternion;

    fn neg(self) -> Self::Output {
        Quaternion::new(-self.w, -self.x, -self.y, -self.z)
    }
}

/// One bone's current local rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct BonePose {
    pub name: String,
    pub rotation: Quaternion,
}

/// The bones to transmit on one sampler tick, in send order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSnapshot {
    bones: Vec<BonePose>,
}

impl PoseSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, rotation: Quaternion) {
        self.bones.push(BonePose {
            name: name.into(),
            rotation,
        });
    }

    pub fn bones(&self) -> &[BonePose] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Quaternion)> for PoseSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, Quaternion)>>(iter: I) -> Self {
        let mut snapshot = PoseSnapshot::new();
        for (name, rotation) in iter {
            snapshot.push(name, rotation);
        }
        snapshot
    }
}

/// Read-only access to live pose data.
pub trait PoseSource {
    /// The current pose, or `None` when the target is unavailable this tick.
    fn snapshot(&mut self) -> Option<PoseSnapshot>;
}

impl<F> PoseSource for F
where
    F: FnMut() -> Option<PoseSnapshot>,
{
    fn snapshot(&mut self) -> Option<PoseSnapshot> {
        self()
    }
}

/// A fixed pose, returned unchanged on every tick.
#[derive(Debug, Clone, Default)]
pub struct StaticPose(pub PoseSnapshot);

impl PoseSource for StaticPose {
    fn snapshot(&mut self) -> Option<PoseSnapshot> {
        Some(self.0.clone())
    }
}

/// Bone rotation as written in a pose file.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum RotationSpec {
    /// `[w, x, y, z]`
    Wxyz([f64; 4]),
    /// `{"w": .., "x": .., "y": .., "z": ..}`
    Named { w: f64, x: f64, y: f64, z: f64 },
}

impl From<RotationSpec> for Quaternion {
    fn from(spec: RotationSpec) -> Self {
        match spec {
            RotationSpec::Wxyz([w, x, y, z]) => Quaternion::new(w, x, y, z),
            RotationSpec::Named { w, x, y, z } => Quaternion::new(w, x, y, z),
        }
    }
}

type PoseDocument = BTreeMap<String, BTreeMap<String, RotationSpec>>;

/// Poses read from a JSON file that another process keeps up to date.
///
/// ```json
/// { "Armature": { "chest": [1.0, 0.0, 0.0, 0.0], "head": {"w": 1, "x": 0, "y": 0, "z": 0} } }
/// ```
///
/// The file is re-read on every snapshot. With no target configured, a file
/// holding exactly one armature selects it.
#[derive(Debug)]
pub struct PoseFile {
    path: PathBuf,
    target: Option<String>,
    last_problem: Option<String>,
}

impl PoseFile {
    pub fn new(path: impl Into<PathBuf>, target: Option<String>) -> Self {
        Self {
            path: path.into(),
            target,
            last_problem: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Names of the armatures currently in the file.
    pub fn armatures(&self) -> std::io::Result<Vec<String>> {
        let document = self.load()?;
        Ok(document.into_keys().collect())
    }

    fn load(&self) -> std::io::Result<PoseDocument> {
        let raw = std::fs::read(&self.path)?;
        serde_json::from_slice(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    /// Log a problem once, not on every tick.
    fn report(&mut self, problem: String) {
        if self.last_problem.as_deref() != Some(problem.as_str()) {
            warn!(path = ?self.path, "{problem}");
            self.last_problem = Some(problem);
        }
    }
}

impl PoseSource for PoseFile {
    fn snapshot(&mut self) -> Option<PoseSnapshot> {
        let mut document = match self.load() {
            Ok(document) => document,
            Err(err) => {
                self.report(format!("pose file unusable: {err}"));
                return None;
            }
        };

        let bones = match self.target.as_deref() {
            Some(target) => match document.remove(target) {
                Some(bones) => bones,
                None => {
                    self.report(format!("armature '{target}' not in pose file"));
                    return None;
                }
            },
            None if document.len() == 1 => match document.into_values().next() {
                Some(bones) => bones,
                None => return None,
            },
            None => {
                self.report(format!(
                    "no target armature set and pose file holds {} armatures",
                    document.len()
                ));
                return None;
            }
        };

        if self.last_problem.take().is_some() {
            debug!(path = ?self.path, "pose file usable again");
        }
        Some(
            bones
                .into_iter()
                .map(|(name, spec)| (name, Quaternion::from(spec)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "puppetry-pose-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("pose.json");
        std::fs::write(&path, contents).expect("pose file should be writable");
        path
    }

    fn assert_close(actual: [f64; 3], expected: [f64; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn negative_scalar_is_flipped() {
        let q = Quaternion::new(-0.5, 0.5, -0.5, 0.5);
        assert_close(q.local_rot(), [-0.5, 0.5, -0.5]);
    }

    #[test]
    fn non_negative_scalar_is_kept() {
        let q = Quaternion::new(0.5, 0.5, -0.5, 0.5);
        assert_close(q.local_rot(), [0.5, -0.5, 0.5]);

        let zero_w = Quaternion::new(0.0, 0.0, 1.0, 0.0);
        assert_close(zero_w.local_rot(), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn rotation_is_normalized_first() {
        let q = Quaternion::new(-2.0, 0.0, 0.0, 2.0);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_close(q.local_rot(), [0.0, 0.0, -s]);
        assert!((q.canonical().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_rotation_is_identity() {
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).canonical(), Quaternion::IDENTITY);
        assert_eq!(
            Quaternion::new(f64::NAN, 0.0, 0.0, 0.0).canonical(),
            Quaternion::IDENTITY
        );
    }

    #[test]
    fn snapshot_keeps_order() {
        let snapshot: PoseSnapshot = [("hip", Quaternion::IDENTITY), ("chest", Quaternion::IDENTITY)]
            .into_iter()
            .collect();
        let names: Vec<&str> = snapshot.bones().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["hip", "chest"]);
    }

    #[test]
    fn closure_is_a_pose_source() {
        let mut calls = 0;
        let mut source = || -> Option<PoseSnapshot> {
            calls += 1;
            None
        };
        assert!(PoseSource::snapshot(&mut source).is_none());
        assert_eq!(calls, 1);
    }

    #[test]
    fn pose_file_single_armature_is_auto_selected() {
        let path = temp_file(
            "single",
            r#"{"Rig": {"chest": [1, 0, 0, 0], "head": {"w": 0, "x": 0, "y": 1, "z": 0}}}"#,
        );
        let mut source = PoseFile::new(&path, None);

        let snapshot = source.snapshot().expect("snapshot should load");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.bones()[0].name, "chest");
        assert_eq!(snapshot.bones()[1].rotation, Quaternion::new(0.0, 0.0, 1.0, 0.0));
        assert_eq!(source.armatures().unwrap(), vec!["Rig".to_string()]);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn pose_file_target_selection() {
        let path = temp_file(
            "target",
            r#"{"A": {"hip": [1, 0, 0, 0]}, "B": {"neck": [1, 0, 0, 0]}}"#,
        );

        assert!(PoseFile::new(&path, None).snapshot().is_none());
        assert!(PoseFile::new(&path, Some("C".into())).snapshot().is_none());

        let snapshot = PoseFile::new(&path, Some("B".into())).snapshot().unwrap();
        assert_eq!(snapshot.bones()[0].name, "neck");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn pose_file_missing_or_malformed() {
        let mut missing = PoseFile::new("/nonexistent/puppetry/pose.json", None);
        assert!(missing.snapshot().is_none());
        assert!(missing.last_problem.is_some());

        let path = temp_file("bad", "{not json");
        assert!(PoseFile::new(&path, None).snapshot().is_none());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
