//! Startup enumeration of the platform's cameras.

use super::{CameraDescriptor, CameraHal, DeviceError, Facing};

/// In-memory table of the cameras found at startup.
///
/// Built once and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    descriptors: Vec<CameraDescriptor>,
    first_back: Option<CameraDescriptor>,
    first_front: Option<CameraDescriptor>,
}

impl DeviceRegistry {
    /// Reads every camera index the platform reports.
    ///
    /// Cameras whose information cannot be read are skipped. Only the first
    /// camera of each facing is recorded as that facing's default.
    pub fn enumerate(hal: &dyn CameraHal) -> Self {
        let count = hal.number_of_cameras();
        let mut registry = Self::default();

        for index in 0..count {
            match hal.camera_info(index) {
                Ok(descriptor) => registry.insert(descriptor),
                Err(e) => tracing::warn!(index, error = %e, "Skipping unreadable camera"),
            }
        }

        tracing::info!(
            cameras = registry.descriptors.len(),
            back = ?registry.first_back.map(|d| d.id()),
            front = ?registry.first_front.map(|d| d.id()),
            "Camera enumeration complete"
        );

        registry
    }

    fn insert(&mut self, descriptor: CameraDescriptor) {
        let slot = match descriptor.facing() {
            Facing::Back => &mut self.first_back,
            Facing::Front => &mut self.first_front,
        };
        if slot.is_none() {
            *slot = Some(descriptor);
        }
        self.descriptors.push(descriptor);
    }

    /// All readable cameras in platform index order.
    pub fn descriptors(&self) -> &[CameraDescriptor] {
        &self.descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, id: u32) -> Option<CameraDescriptor> {
        self.descriptors.iter().copied().find(|d| d.id() == id)
    }

    pub fn first_back(&self) -> Option<CameraDescriptor> {
        self.first_back
    }

    pub fn first_front(&self) -> Option<CameraDescriptor> {
        self.first_front
    }

    /// First camera with the given facing.
    pub fn first_with_facing(&self, facing: Facing) -> Option<CameraDescriptor> {
        match facing {
            Facing::Back => self.first_back,
            Facing::Front => self.first_front,
        }
    }

    /// Camera to open when the caller has no preference: front first, then back.
    pub fn default_camera(&self) -> Result<CameraDescriptor, DeviceError> {
        self.first_front
            .or(self.first_back)
            .ok_or_else(|| DeviceError::NoDevice("platform reports no cameras".into()))
    }

    /// The default camera of the opposite facing to `current_id`.
    pub fn switch_target(&self, current_id: u32) -> Result<CameraDescriptor, DeviceError> {
        let current = self
            .descriptor(current_id)
            .ok_or_else(|| DeviceError::NoDevice(format!("unknown camera id {}", current_id)))?;
        let wanted = current.facing().opposite();
        self.first_with_facing(wanted)
            .ok_or_else(|| DeviceError::NoDevice(format!("no {} camera to switch to", wanted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{MockCameraSpec, MockHal};

    fn hal_with(facings: &[(Facing, u16)]) -> MockHal {
        MockHal::new(
            facings
                .iter()
                .map(|&(facing, orientation)| MockCameraSpec::new(facing, orientation))
                .collect(),
        )
    }

    #[test]
    fn test_first_of_each_facing_is_kept() {
        let hal = hal_with(&[
            (Facing::Back, 90),
            (Facing::Front, 270),
            (Facing::Back, 0),
            (Facing::Front, 90),
        ]);
        let registry = DeviceRegistry::enumerate(&hal);

        assert_eq!(registry.descriptors().len(), 4);
        assert_eq!(registry.first_back().unwrap().id(), 0);
        assert_eq!(registry.first_front().unwrap().id(), 1);
        assert_eq!(registry.first_back().unwrap().sensor_orientation(), 90);
    }

    #[test]
    fn test_default_prefers_front() {
        let hal = hal_with(&[(Facing::Back, 90), (Facing::Front, 270)]);
        let registry = DeviceRegistry::enumerate(&hal);
        assert_eq!(registry.default_camera().unwrap().facing(), Facing::Front);

        let back_only = DeviceRegistry::enumerate(&hal_with(&[(Facing::Back, 90)]));
        assert_eq!(back_only.default_camera().unwrap().id(), 0);
    }

    #[test]
    fn test_no_cameras_reports_no_device() {
        let registry = DeviceRegistry::enumerate(&hal_with(&[]));
        assert!(registry.is_empty());
        assert!(matches!(registry.default_camera(), Err(DeviceError::NoDevice(_))));
    }

    #[test]
    fn test_switch_target() {
        let hal = hal_with(&[(Facing::Back, 90), (Facing::Front, 270)]);
        let registry = DeviceRegistry::enumerate(&hal);
        assert_eq!(registry.switch_target(0).unwrap().id(), 1);
        assert_eq!(registry.switch_target(1).unwrap().id(), 0);
        assert!(registry.switch_target(5).is_err());

        let back_only = DeviceRegistry::enumerate(&hal_with(&[(Facing::Back, 90)]));
        assert!(matches!(back_only.switch_target(0), Err(DeviceError::NoDevice(_))));
    }
}
