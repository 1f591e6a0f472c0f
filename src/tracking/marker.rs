//! Lagrangian markers: state, ownership, and multi-stage advection.
//!
//! A marker is replicated on every rank; one rank (the owner) holds the
//! authoritative mutable state, everyone else carries synchronized
//! metadata (element, owner, position, local coordinates). All mutation
//! funnels through collective sync points so the ownership invariant
//! holds at every barrier: exactly one owner per marker at any time.

use crate::config::TrackingConfig;
use crate::error::MarkerError;
use crate::fem::{field, Solution};
use crate::mesh::Mesh;
use crate::tracking::advect::ButcherTableau;
use crate::tracking::comm::Communicator;
use crate::tracking::locator::{locate, LocateOutcome};
use log::debug;
use nalgebra::{Point, SMatrix, SVector};
use rayon::prelude::*;

/// Marker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStatus {
    /// Located and owned; safe to interpolate and advance.
    Active,
    /// A collective sync is in flight; ownership is not yet settled.
    /// Retried at the next synchronization point.
    Pending,
    /// The marker left the domain; terminal. Position and local
    /// coordinates are no longer advanced.
    LeftDomain,
}

/// Material-point quantities carried per marker, updated by external
/// physics between advection passes. This is the named-field rendition
/// of the historical flat `3D+2` vector (displacement, velocity,
/// acceleration, mass, density); `pack`/`unpack` reproduce that layout
/// for the handoff wire buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialState<const D: usize> {
    pub displacement: SVector<f64, D>,
    pub velocity: SVector<f64, D>,
    pub acceleration: SVector<f64, D>,
    pub mass: f64,
    pub density: f64,
}

impl<const D: usize> Default for MaterialState<D> {
    fn default() -> Self {
        Self {
            displacement: SVector::zeros(),
            velocity: SVector::zeros(),
            acceleration: SVector::zeros(),
            mass: 1.0,
            density: 1.0,
        }
    }
}

impl<const D: usize> MaterialState<D> {
    /// Length of the flat layout: displacement, velocity, acceleration,
    /// mass, density.
    pub const fn packed_len() -> usize {
        3 * D + 2
    }

    pub fn pack(&self, out: &mut [f64]) {
        debug_assert_eq!(out.len(), Self::packed_len());
        for d in 0..D {
            out[d] = self.displacement[d];
            out[D + d] = self.velocity[d];
            out[2 * D + d] = self.acceleration[d];
        }
        out[3 * D] = self.mass;
        out[3 * D + 1] = self.density;
    }

    pub fn unpack(buf: &[f64]) -> Self {
        debug_assert_eq!(buf.len(), Self::packed_len());
        Self {
            displacement: SVector::from_fn(|d, _| buf[d]),
            velocity: SVector::from_fn(|d, _| buf[D + d]),
            acceleration: SVector::from_fn(|d, _| buf[2 * D + d]),
            mass: buf[3 * D],
            density: buf[3 * D + 1],
        }
    }
}

/// A point particle tracked through the mesh. Borrowed mesh/solution
/// state is passed per call and must outlive the marker.
#[derive(Debug, Clone)]
pub struct Marker<const D: usize> {
    /// Current physical position.
    pub position: Point<f64, D>,
    /// Position at the start of the current advection pass.
    pub origin: Point<f64, D>,
    /// Position at the start of the current sub-interval; part of the
    /// authoritative state so a handed-off marker resumes mid-substep.
    substep_base: Point<f64, D>,
    /// Last-known reference coordinates; valid only when `element` is set.
    pub local: SVector<f64, D>,
    /// Containing element, if resolved.
    pub element: Option<usize>,
    /// Element before the most recent relocation; excluded from the next
    /// walk so the search cannot bounce straight back.
    pub previous_element: Option<usize>,
    /// Rank holding authoritative state.
    pub owner: usize,
    /// Stage registers K_j = h * v_j of the current sub-interval.
    stages: Vec<SVector<f64, D>>,
    /// Completed stages across the pass: `substep * order + stage`.
    step: u32,
    finished: bool,
    pub status: MarkerStatus,
    pub material: MaterialState<D>,
    /// Deformation gradient, identity at construction; updated by
    /// external physics.
    pub deformation_gradient: SMatrix<f64, D, D>,
}

impl<const D: usize> Marker<D> {
    /// Create a marker at a physical position and locate it. The mesh is
    /// validated once here; structural problems are fatal. A position
    /// outside the domain yields a marker already in the `LeftDomain`
    /// state. All ranks construct identical replicas deterministically,
    /// so no collective is needed yet.
    pub fn new(
        position: Point<f64, D>,
        mesh: &Mesh<D>,
        sol: &Solution<D>,
        cfg: &TrackingConfig,
    ) -> Result<Self, MarkerError> {
        mesh.validate()?;
        Ok(Self::located_at(position, mesh, sol, cfg))
    }

    /// Construction body shared with `MarkerSet::from_points`, which
    /// validates the mesh once for the whole batch.
    fn located_at(
        position: Point<f64, D>,
        mesh: &Mesh<D>,
        sol: &Solution<D>,
        cfg: &TrackingConfig,
    ) -> Self {
        let mut marker = Self {
            position,
            origin: position,
            substep_base: position,
            local: SVector::zeros(),
            element: None,
            previous_element: None,
            owner: 0,
            stages: Vec::new(),
            step: 0,
            finished: true,
            status: MarkerStatus::Pending,
            material: MaterialState::default(),
            deformation_gradient: SMatrix::identity(),
        };
        match locate(&position, None, None, None, mesh, sol, 0.0, cfg) {
            LocateOutcome::Located(l) => {
                marker.element = Some(l.element);
                marker.owner = l.owner;
                marker.local = l.local;
                marker.status = MarkerStatus::Active;
            }
            LocateOutcome::NotInDomain => {
                marker.status = MarkerStatus::LeftDomain;
            }
        }
        marker
    }

    pub fn status(&self) -> MarkerStatus {
        self.status
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Fraction of the macro step this marker has reached, for
    /// reporting and checkpointing: `(substep + c_j) / n`.
    pub fn pass_fraction(&self, tableau: &ButcherTableau, n: usize) -> f64 {
        let order = tableau.order() as u32;
        let step = if self.finished {
            n as u32 * order
        } else {
            self.step
        };
        let substep = (step / order) as f64;
        let stage = (step % order) as usize;
        (substep + tableau.c(stage)) / n as f64
    }

    /// Reset the pass bookkeeping: origin, step counter, stage registers.
    fn begin_pass(&mut self, order: usize) {
        self.origin = self.position;
        self.substep_base = self.position;
        self.step = 0;
        self.finished = false;
        self.stages = vec![SVector::zeros(); order];
    }

    /// Local coordinates as seen by every rank: broadcast from the
    /// owner so non-owners read a consistent value.
    pub fn local_coordinates(&self, comm: &dyn Communicator) -> SVector<f64, D> {
        let mut buf = vec![0.0; D];
        if comm.rank() == self.owner {
            buf.copy_from_slice(self.local.as_slice());
        }
        comm.broadcast_f64s(self.owner, &mut buf);
        SVector::from_fn(|d, _| buf[d])
    }

    /// Apply the accumulated material displacement to the position
    /// (between advection passes, external physics writes displacement).
    pub fn update_position_from_displacement(&mut self) {
        self.position += self.material.displacement;
    }

    fn packed_state_len(&self) -> usize {
        4 * D + 1 + MaterialState::<D>::packed_len() + D * D + self.stages.len() * D
    }

    fn pack_state(&self, out: &mut [f64]) {
        let mut at = 0;
        let mut put = |vals: &[f64], at: &mut usize| {
            out[*at..*at + vals.len()].copy_from_slice(vals);
            *at += vals.len();
        };
        put(self.position.coords.as_slice(), &mut at);
        put(self.origin.coords.as_slice(), &mut at);
        put(self.substep_base.coords.as_slice(), &mut at);
        put(self.local.as_slice(), &mut at);
        put(&[self.step as f64], &mut at);
        let mut mat = [0.0; 64];
        let mat = &mut mat[..MaterialState::<D>::packed_len()];
        self.material.pack(mat);
        put(mat, &mut at);
        put(self.deformation_gradient.as_slice(), &mut at);
        for k in &self.stages {
            put(k.as_slice(), &mut at);
        }
        debug_assert_eq!(at, self.packed_state_len());
    }

    fn unpack_state(&mut self, buf: &[f64]) {
        let mut at = 0;
        let mut take = |n: usize, at: &mut usize| {
            let s = &buf[*at..*at + n];
            *at += n;
            s
        };
        self.position = Point::from(SVector::from_row_slice(take(D, &mut at)));
        self.origin = Point::from(SVector::from_row_slice(take(D, &mut at)));
        self.substep_base = Point::from(SVector::from_row_slice(take(D, &mut at)));
        self.local = SVector::from_row_slice(take(D, &mut at));
        self.step = take(1, &mut at)[0] as u32;
        self.material = MaterialState::unpack(take(MaterialState::<D>::packed_len(), &mut at));
        self.deformation_gradient =
            SMatrix::from_column_slice(take(D * D, &mut at));
        for j in 0..self.stages.len() {
            self.stages[j] = SVector::from_row_slice(take(D, &mut at));
        }
        debug_assert_eq!(at, self.packed_state_len());
    }

    /// Collective relocation and ownership sync at pass fraction `s`.
    ///
    /// The owner locates its authoritative position and broadcasts the
    /// verdict; every rank then agrees on element, position, local
    /// coordinates, and owner. When the containing element is owned by a
    /// different rank, the full authoritative state is handed off,
    /// exactly once. A definitive miss (after the serial fallback) moves
    /// the marker to `LeftDomain` on all ranks.
    pub fn relocate_collective(
        &mut self,
        mesh: &Mesh<D>,
        sol: &Solution<D>,
        comm: &dyn Communicator,
        s: f64,
        cfg: &TrackingConfig,
    ) {
        if self.status == MarkerStatus::LeftDomain {
            return;
        }
        self.status = MarkerStatus::Pending;
        let owner = self.owner;

        // The element verdict travels as an integer (element + 1, or 0
        // for a definitive miss); position and local coordinates follow
        // in a separate float block.
        let mut elem_tag: u64 = 0;
        let mut verdict = None;
        if comm.rank() == owner {
            let warm = self.element.map(|_| self.local);
            let hint = self.element;
            let prev = self.previous_element;
            if let LocateOutcome::Located(l) =
                locate(&self.position, hint, prev, warm, mesh, sol, s, cfg)
            {
                elem_tag = (l.element + 1) as u64;
                verdict = Some(l.local);
            }
        }
        comm.broadcast_u64(owner, &mut elem_tag);

        if elem_tag == 0 {
            self.element = None;
            self.status = MarkerStatus::LeftDomain;
            return;
        }
        let element = elem_tag as usize - 1;

        let mut body = vec![0.0; 2 * D];
        if let Some(local) = verdict {
            body[..D].copy_from_slice(self.position.coords.as_slice());
            body[D..].copy_from_slice(local.as_slice());
        }
        comm.broadcast_f64s(owner, &mut body);

        if self.element != Some(element) {
            self.previous_element = self.element;
        }
        self.element = Some(element);
        for d in 0..D {
            self.position[d] = body[d];
            self.local[d] = body[D + d];
        }

        let new_owner = mesh.partition.owner(element);
        if new_owner != owner {
            debug!("marker handoff: rank {owner} -> rank {new_owner} (element {element})");
            let mut state = vec![0.0; self.packed_state_len()];
            if comm.rank() == owner {
                self.pack_state(&mut state);
            }
            comm.broadcast_f64s(owner, &mut state);
            if comm.rank() == new_owner {
                self.unpack_state(&state);
            }
            self.owner = new_owner;
        }
        self.status = MarkerStatus::Active;
    }

    /// Advance the marker over a macro time step `t_total` split into
    /// `n` sub-intervals, re-localizing at every stage. Returns the
    /// final status; `LeftDomain` means the marker exited the mesh and
    /// was not advanced further. Resumes an interrupted pass (same
    /// tableau and `n`) from its step counter.
    pub fn advect(
        &mut self,
        mesh: &Mesh<D>,
        sol: &Solution<D>,
        comm: &dyn Communicator,
        tableau: &ButcherTableau,
        n: usize,
        t_total: f64,
        cfg: &TrackingConfig,
    ) -> Result<MarkerStatus, MarkerError> {
        if n == 0 {
            return Err(MarkerError::ZeroSubsteps(n));
        }
        if self.status == MarkerStatus::LeftDomain {
            return Ok(self.status);
        }
        let order = tableau.order();
        if self.finished || self.stages.len() != order {
            self.begin_pass(order);
        }
        let h = t_total / n as f64;
        let total = (n * order) as u32;

        while self.step < total {
            let substep = self.step as usize / order;
            let stage = self.step as usize % order;
            if stage == 0 {
                self.substep_base = self.position;
            }

            // Stage evaluation point from the strictly lower block.
            if comm.rank() == self.owner {
                let mut x = self.substep_base;
                for k in 0..stage {
                    x += self.stages[k] * tableau.a(stage, k);
                }
                self.position = x;
            }
            let s = (substep as f64 + tableau.c(stage)) / n as f64;
            self.relocate_collective(mesh, sol, comm, s, cfg);
            if self.status == MarkerStatus::LeftDomain {
                return Ok(self.status);
            }

            if comm.rank() == self.owner {
                if let Some(element) = self.element {
                    let v = field::interpolate(mesh, &sol.velocity, element, self.local.as_slice(), s);
                    self.stages[stage] = v * h;
                }
            }
            self.step += 1;

            // Final combination closes the sub-interval.
            if stage + 1 == order {
                if comm.rank() == self.owner {
                    let mut x = self.substep_base;
                    for (k, register) in self.stages.iter().enumerate() {
                        x += register * tableau.b(k);
                    }
                    self.position = x;
                }
                let s_end = (substep + 1) as f64 / n as f64;
                self.relocate_collective(mesh, sol, comm, s_end, cfg);
                if self.status == MarkerStatus::LeftDomain {
                    return Ok(self.status);
                }
            }
        }
        self.finished = true;
        Ok(self.status)
    }
}

/// A collection of markers advanced together. Markers are independent;
/// with a single-rank communicator they are processed in parallel, while
/// multi-rank runs keep a deterministic order so every rank reaches the
/// collectives in the same sequence.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet<const D: usize> {
    pub markers: Vec<Marker<D>>,
}

impl<const D: usize> MarkerSet<D> {
    /// Seed markers at the given points. The mesh is validated once for
    /// the whole batch, not per marker.
    pub fn from_points(
        points: &[Point<f64, D>],
        mesh: &Mesh<D>,
        sol: &Solution<D>,
        cfg: &TrackingConfig,
    ) -> Result<Self, MarkerError> {
        mesh.validate()?;
        let markers = points
            .iter()
            .map(|p| Marker::located_at(*p, mesh, sol, cfg))
            .collect();
        Ok(Self { markers })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Advect every marker through one macro step.
    #[allow(clippy::too_many_arguments)]
    pub fn advect_all<C: Communicator>(
        &mut self,
        mesh: &Mesh<D>,
        sol: &Solution<D>,
        comm: &C,
        tableau: &ButcherTableau,
        n: usize,
        t_total: f64,
        cfg: &TrackingConfig,
    ) -> Result<(), MarkerError> {
        if comm.size() == 1 {
            self.markers
                .par_iter_mut()
                .try_for_each(|m| m.advect(mesh, sol, comm, tableau, n, t_total, cfg).map(|_| ()))
        } else {
            for m in &mut self.markers {
                m.advect(mesh, sol, comm, tableau, n, t_total, cfg)?;
            }
            Ok(())
        }
    }

    /// Number of markers still active (not exited).
    pub fn num_active(&self) -> usize {
        self.markers
            .iter()
            .filter(|m| m.status == MarkerStatus::Active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::NodalField;
    use crate::mesh::{generator, PartitionMap};
    use crate::tracking::comm::SerialComm;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Vector2};

    #[test]
    fn material_state_round_trips_the_flat_layout() {
        let mat = MaterialState::<2> {
            displacement: Vector2::new(0.1, 0.2),
            velocity: Vector2::new(1.0, -1.0),
            acceleration: Vector2::new(0.0, 9.8),
            mass: 2.5,
            density: 1.2,
        };
        let mut buf = [0.0; 8];
        mat.pack(&mut buf);
        // Flat layout: displacement, velocity, acceleration, mass, density.
        assert_relative_eq!(buf[0], 0.1);
        assert_relative_eq!(buf[2], 1.0);
        assert_relative_eq!(buf[4], 0.0);
        assert_relative_eq!(buf[6], 2.5);
        assert_relative_eq!(buf[7], 1.2);
        assert_eq!(MaterialState::<2>::unpack(&buf), mat);
    }

    #[test]
    fn default_material_is_unit_mass_and_density() {
        let mat = MaterialState::<3>::default();
        assert_relative_eq!(mat.mass, 1.0);
        assert_relative_eq!(mat.density, 1.0);
        assert_relative_eq!(mat.velocity.norm(), 0.0);
    }

    #[test]
    fn displacement_update_moves_and_relocates_the_marker() {
        let mesh = generator::quad_grid(2, 2, 2.0, 2.0);
        let sol = Solution::new(&mesh, NodalField::zero(mesh.num_nodes())).unwrap();
        let cfg = TrackingConfig::default();

        let mut m = Marker::new(Point2::new(0.5, 0.5), &mesh, &sol, &cfg).unwrap();
        assert_eq!(m.element, Some(0));
        m.material.displacement = Vector2::new(1.0, 0.25);
        m.update_position_from_displacement();
        assert_relative_eq!(m.position.x, 1.5);
        assert_relative_eq!(m.position.y, 0.75);

        m.relocate_collective(&mesh, &sol, &SerialComm, 0.0, &cfg);
        assert_eq!(m.status, MarkerStatus::Active);
        assert_eq!(m.element, Some(1));
        assert_eq!(m.previous_element, Some(0));
    }

    #[test]
    fn marker_set_rejects_a_bad_partition() {
        let mesh = generator::quad_grid(2, 2, 1.0, 1.0)
            .with_partition(PartitionMap::from_owners(vec![0], 1));
        let sol = Solution::new(&mesh, NodalField::zero(mesh.num_nodes())).unwrap();
        let cfg = TrackingConfig::default();
        let err = MarkerSet::from_points(&[Point2::new(0.5, 0.5)], &mesh, &sol, &cfg)
            .unwrap_err();
        assert!(matches!(err, MarkerError::PartitionSizeMismatch { .. }));
    }
}
