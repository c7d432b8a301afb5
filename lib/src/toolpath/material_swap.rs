//! Material head switching.
//!
//! Each material sits in its own head with its own vertical axis. Heads are
//! mounted at different XY offsets on the gantry, so after a swap the working
//! frame is redefined such that the same logical coordinates land on the same
//! substrate location under the new nozzle.

use crate::config::{MaterialConfig, MaterialTable};
use crate::gcode::{DepositionDevice, LOGICAL_Z};
use crate::geometry::PointF;
use crate::{CoordF, Result};
use log::debug;

/// Active material and the frame it prints in.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialState {
    /// Index into the material table.
    pub material: usize,
    /// Physical axis the logical Z axis is bound to.
    pub axis: String,
    /// Position most recently assigned to the head by a home redefinition.
    pub home_offset: PointF,
}

/// Switches the active material head on a [`DepositionDevice`].
#[derive(Debug)]
pub struct MaterialSwapController<'a> {
    materials: &'a MaterialTable,
    travel_height: CoordF,
    state: MaterialState,
    swaps: usize,
}

impl<'a> MaterialSwapController<'a> {
    /// Start with `initial` active. Nothing is emitted until
    /// [`activate`](Self::activate) or [`swap`](Self::swap).
    pub fn new(materials: &'a MaterialTable, initial: usize, travel_height: CoordF) -> Result<Self> {
        let config = materials.get(initial)?;
        Ok(Self {
            materials,
            travel_height,
            state: MaterialState {
                material: initial,
                axis: config.axis_name.clone(),
                home_offset: PointF::zero(),
            },
            swaps: 0,
        })
    }

    /// Bind the logical Z axis to the initial head.
    pub fn activate<D: DepositionDevice + ?Sized>(&self, device: &mut D) {
        device.rebind_axis(LOGICAL_Z, &self.state.axis);
    }

    /// Switch to material `new`.
    ///
    /// Returns `Ok(false)` without touching the device when `new` is already
    /// active. Otherwise parks the current head at travel height, rebinds the
    /// vertical axis and redefines the XY home so the new head's nozzle lands
    /// where the previous one would have.
    pub fn swap<D: DepositionDevice + ?Sized>(&mut self, new: usize, device: &mut D) -> Result<bool> {
        if new == self.state.material {
            return Ok(false);
        }
        let prev = self.materials.get(self.state.material)?;
        let next = self.materials.get(new)?;

        device.comment(&format!(
            "switch material {} -> {} (axis {})",
            self.state.material, new, next.axis_name
        ));
        device.move_absolute(None, None, Some(self.travel_height));
        device.rebind_axis(LOGICAL_Z, &next.axis_name);

        let current = device.current_position();
        let home = PointF::new(
            current.x - (next.x_home_position - prev.x_home_position),
            current.y - (next.y_home_position - prev.y_home_position),
        );
        device.set_home_offset(Some(home.x), Some(home.y));

        debug!(
            "Material {} -> {}: axis {} -> {}, home ({:.3}, {:.3}) -> {}",
            self.state.material,
            new,
            self.state.axis,
            next.axis_name,
            current.x,
            current.y,
            home
        );

        self.state = MaterialState {
            material: new,
            axis: next.axis_name.clone(),
            home_offset: home,
        };
        self.swaps += 1;
        Ok(true)
    }

    /// Current material state.
    pub fn state(&self) -> &MaterialState {
        &self.state
    }

    pub fn active_material(&self) -> usize {
        self.state.material
    }

    /// Configuration of the active material.
    pub fn active_config(&self) -> Result<&'a MaterialConfig> {
        self.materials.get(self.state.material)
    }

    /// Number of swaps actually performed.
    pub fn swap_count(&self) -> usize {
        self.swaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::{GCodeCommand, GCodeWriter};
    use crate::Error;

    fn materials() -> MaterialTable {
        MaterialTable::new(vec![
            MaterialConfig::new("A", 1, 0.5).home(0.0, 0.0),
            MaterialConfig::new("B", 2, 1.0).home(5.0, 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_swap_translates_home() {
        let table = materials();
        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 0, 10.0).unwrap();
        swap.activate(&mut writer);
        writer.move_absolute(Some(3.0), Some(3.0), None);

        assert!(swap.swap(1, &mut writer).unwrap());

        let state = swap.state();
        assert_eq!(state.material, 1);
        assert_eq!(state.axis, "B");
        assert!(state.home_offset.approx_eq(&PointF::new(-2.0, 1.0), 1e-12));
        assert_eq!(writer.bound_axis(LOGICAL_Z), "B");

        let pos = writer.current_position();
        assert!((pos.x + 2.0).abs() < 1e-12);
        assert!((pos.y - 1.0).abs() < 1e-12);
        assert!((pos.z - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_swap_parks_before_rebinding() {
        let table = materials();
        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 0, 10.0).unwrap();
        swap.activate(&mut writer);
        swap.swap(1, &mut writer).unwrap();

        let gcode = writer.into_gcode();
        let lines: Vec<&str> = gcode.lines().collect();
        let park = lines.iter().position(|l| l.starts_with("G1 A10")).unwrap();
        let home = lines.iter().position(|l| l.starts_with("G92")).unwrap();
        assert!(park < home);
    }

    #[test]
    fn test_swap_to_active_material_is_noop() {
        let table = materials();
        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 1, 10.0).unwrap();
        let before = writer.commands().len();

        assert!(!swap.swap(1, &mut writer).unwrap());
        assert_eq!(writer.commands().len(), before);
        assert_eq!(swap.swap_count(), 0);
    }

    #[test]
    fn test_swap_back_restores_frame() {
        let table = materials();
        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 0, 10.0).unwrap();
        writer.move_absolute(Some(3.0), Some(3.0), None);

        swap.swap(1, &mut writer).unwrap();
        swap.swap(0, &mut writer).unwrap();

        assert_eq!(swap.swap_count(), 2);
        assert!(swap.state().home_offset.approx_eq(&PointF::new(3.0, 3.0), 1e-12));
        let resets = writer
            .commands()
            .iter()
            .filter(|c| matches!(c, GCodeCommand::SetPosition { .. }))
            .count();
        assert_eq!(resets, 2);
    }

    #[test]
    fn test_unknown_material_rejected() {
        let table = materials();
        assert!(matches!(
            MaterialSwapController::new(&table, 5, 10.0),
            Err(Error::Configuration(_))
        ));

        let mut writer = GCodeWriter::default();
        let mut swap = MaterialSwapController::new(&table, 0, 10.0).unwrap();
        let before = writer.commands().len();
        assert!(swap.swap(3, &mut writer).is_err());
        assert_eq!(writer.commands().len(), before);
        assert_eq!(swap.active_material(), 0);
    }
}
