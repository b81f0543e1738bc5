//! The reservation manager.
//!
//! # Model
//!
//! Every resource maps to a list of [`Reservation`]s with pairwise disjoint
//! windows.  A request for `[start, end)` is denied if any other holder's
//! window on that resource overlaps it.  Expired windows never overlap a
//! request starting at `now`, so they are harmless until
//! [`purge_expired`](ReservationManager::purge_expired) sweeps them.
//!
//! Resources inside the runway zone (zone nodes, runway edges, the
//! aggregate `Runway` key) are additionally exclusive *as a group*: a holder
//! may only acquire one if no other holder has an overlapping window on any
//! of them.  Acquiring `Runway` itself also requires that no other aircraft
//! has reported standing on a zone node or rolling along a runway edge.
//!
//! # Batches
//!
//! All multi-resource requests go through one routine that acquires in
//! order and, on the first denial, removes exactly the reservations it
//! created in this call.  Windows the holder already had are stretched to
//! the requested end, and restored if the batch is refused.
//!
//! # Determinism
//!
//! The per-resource table is a hash map, but nothing iterates it in a way
//! that affects outcomes; holder sets, occupancy and proposals live in
//! `BTreeMap`s.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use gm_core::{AircraftId, NodeId, Priority, ProposalId, Tick};
use gm_topology::{AirportGraph, EdgeKey, RunwayZone};

use crate::outcome::{Denied, Grant, RequestResult};
use crate::proposal::{ConflictProposal, ProposalKind, ProposalParams, ProposalStatus};
use crate::resource::{lease_window, Occupancy, Reservation, Resource};

#[cfg(feature = "fx-hash")]
type ResourceMap<V> = rustc_hash::FxHashMap<Resource, V>;
#[cfg(not(feature = "fx-hash"))]
type ResourceMap<V> = std::collections::HashMap<Resource, V>;

/// How `try_acquire` satisfied one resource of a batch.
enum Acquired {
    /// A fresh window was stored.
    New,
    /// An existing window was stretched; carries its previous end.
    Extended(Tick),
    /// An existing window already covered the request.
    Held,
}

// ── Stats ─────────────────────────────────────────────────────────────────────

/// Lifetime counters, for reporting.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReservationStats {
    /// Requests that succeeded (a batch counts once).
    pub granted:     u64,
    /// Requests that were refused.
    pub denied:      u64,
    /// Reservations undone because a later batch member was refused.
    pub rolled_back: u64,
    /// Reservations removed by controller arbitration.
    pub evicted:     u64,
    /// Reservations removed by `release` / `release_all`.
    pub released:    u64,
}

#[derive(Copy, Clone, Debug)]
struct HolderInfo {
    priority: Priority,
    /// Registration sequence number; lower registered earlier.
    order:    u64,
}

// ── ReservationManager ────────────────────────────────────────────────────────

pub struct ReservationManager {
    zone:          RunwayZone,
    table:         ResourceMap<Vec<Reservation>>,
    held:          BTreeMap<AircraftId, BTreeSet<Resource>>,
    holders:       BTreeMap<AircraftId, HolderInfo>,
    next_order:    u64,
    occupancy:     BTreeMap<AircraftId, Occupancy>,
    proposals:     BTreeMap<ProposalId, ConflictProposal>,
    next_proposal: u64,
    stats:         ReservationStats,
}

impl ReservationManager {
    pub fn new(zone: RunwayZone) -> Self {
        Self {
            zone,
            table:         ResourceMap::default(),
            held:          BTreeMap::new(),
            holders:       BTreeMap::new(),
            next_order:    0,
            occupancy:     BTreeMap::new(),
            proposals:     BTreeMap::new(),
            next_proposal: 0,
            stats:         ReservationStats::default(),
        }
    }

    /// A manager whose runway zone is taken from `graph`.
    pub fn for_graph(graph: &AirportGraph) -> Self {
        Self::new(graph.runway_zone().clone())
    }

    pub fn runway_zone(&self) -> &RunwayZone {
        &self.zone
    }

    pub fn stats(&self) -> ReservationStats {
        self.stats
    }

    // ── Holders ───────────────────────────────────────────────────────────

    /// Record `holder` with `priority`.  Re-registering only updates the
    /// priority; registration order is fixed by the first call.
    pub fn register(&mut self, holder: AircraftId, priority: Priority) {
        match self.holders.get_mut(&holder) {
            Some(info) => info.priority = priority,
            None => {
                self.holders.insert(holder, HolderInfo { priority, order: self.next_order });
                self.next_order += 1;
            }
        }
    }

    pub fn is_registered(&self, holder: AircraftId) -> bool {
        self.holders.contains_key(&holder)
    }

    pub fn priority_of(&self, holder: AircraftId) -> Option<Priority> {
        self.holders.get(&holder).map(|i| i.priority)
    }

    pub fn registration_order(&self, holder: AircraftId) -> Option<u64> {
        self.holders.get(&holder).map(|i| i.order)
    }

    /// Returns `false` if `holder` is not registered.
    pub fn set_priority(&mut self, holder: AircraftId, priority: Priority) -> bool {
        match self.holders.get_mut(&holder) {
            Some(info) => {
                info.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Exchange the priorities of two registered holders.
    pub fn swap_priorities(&mut self, a: AircraftId, b: AircraftId) -> bool {
        let (Some(pa), Some(pb)) = (self.priority_of(a), self.priority_of(b)) else {
            return false;
        };
        self.set_priority(a, pb);
        self.set_priority(b, pa);
        debug!(a = %a, b = %b, "priorities swapped");
        true
    }

    /// Sort key under which the first element wins arbitration: higher
    /// priority, then earlier registration, then lower id.
    fn rank(&self, id: AircraftId) -> (Reverse<Priority>, u64, AircraftId) {
        let info = self.holders.get(&id);
        (
            Reverse(info.map_or(0, |i| i.priority)),
            info.map_or(u64::MAX, |i| i.order),
            id,
        )
    }

    // ── Occupancy ─────────────────────────────────────────────────────────

    pub fn report_occupancy(&mut self, holder: AircraftId, occupancy: Occupancy) {
        self.occupancy.insert(holder, occupancy);
    }

    pub fn occupancy_of(&self, holder: AircraftId) -> Occupancy {
        self.occupancy.get(&holder).copied().unwrap_or_default()
    }

    /// The lowest-id aircraft reported standing on `node`, if any.
    pub fn occupant_of(&self, node: NodeId) -> Option<AircraftId> {
        self.occupancy
            .iter()
            .find(|(_, occ)| **occ == Occupancy::At(node))
            .map(|(id, _)| *id)
    }

    fn occupies_runway(&self, occupancy: Occupancy) -> bool {
        match occupancy {
            Occupancy::Airborne => false,
            Occupancy::At(n) => self.zone.contains_node(n),
            Occupancy::Transit { from, to } => self.zone.contains_edge(EdgeKey::new(from, to)),
        }
    }

    fn runway_occupant(&self, except: AircraftId) -> Option<AircraftId> {
        self.occupancy
            .iter()
            .find(|(id, occ)| **id != except && self.occupies_runway(**occ))
            .map(|(id, _)| *id)
    }

    // ── Requests ──────────────────────────────────────────────────────────

    /// Lock a single resource of any kind.
    pub fn request(&mut self, resource: Resource, holder: AircraftId, duration: u64, now: Tick) -> RequestResult {
        self.request_batch(&[resource], holder, duration, now)
    }

    pub fn request_node(&mut self, node: NodeId, holder: AircraftId, duration: u64, now: Tick) -> RequestResult {
        self.request_batch(&[Resource::Node(node)], holder, duration, now)
    }

    /// Lock the hop `from → to`: the destination node, the runway when the
    /// edge is a runway edge, then the edge itself.  All or nothing.
    pub fn request_edge_no_passing(
        &mut self,
        from: NodeId,
        to: NodeId,
        holder: AircraftId,
        duration: u64,
        now: Tick,
    ) -> RequestResult {
        let key = EdgeKey::new(from, to);
        if self.zone.contains_edge(key) {
            self.request_batch(&[Resource::Node(to), Resource::Runway, Resource::Edge(key)], holder, duration, now)
        } else {
            self.request_batch(&[Resource::Node(to), Resource::Edge(key)], holder, duration, now)
        }
    }

    pub fn request_runway_exclusive(&mut self, holder: AircraftId, duration: u64, now: Tick) -> RequestResult {
        self.request_batch(&[Resource::Runway], holder, duration, now)
    }

    /// Atomically lock a heterogeneous set of resources.
    pub fn request_section_group(
        &mut self,
        resources: &[Resource],
        holder: AircraftId,
        duration: u64,
        now: Tick,
    ) -> RequestResult {
        self.request_batch(resources, holder, duration, now)
    }

    fn request_batch(
        &mut self,
        resources: &[Resource],
        holder: AircraftId,
        duration: u64,
        now: Tick,
    ) -> RequestResult {
        let (start, end) = lease_window(now, duration);
        let priority = self.priority_of(holder).unwrap_or(0);
        let mut acquired: Vec<Resource> = Vec::with_capacity(resources.len());
        let mut extended: Vec<(Resource, Tick)> = Vec::new();

        for &resource in resources {
            match self.try_acquire(resource, holder, priority, start, end) {
                Ok(Acquired::New) => acquired.push(resource),
                Ok(Acquired::Extended(prev_end)) => extended.push((resource, prev_end)),
                Ok(Acquired::Held) => {}
                Err(denied) => {
                    for &r in acquired.iter().rev() {
                        self.remove_matching(r, holder, |res| res.start == start && res.end == end);
                    }
                    for &(r, prev_end) in extended.iter().rev() {
                        self.shorten(r, holder, end, prev_end);
                    }
                    if !acquired.is_empty() {
                        self.stats.rolled_back += acquired.len() as u64;
                        debug!(
                            aircraft = %holder,
                            undone = acquired.len(),
                            resource = %denied.resource,
                            "batch rolled back"
                        );
                    }
                    self.stats.denied += 1;
                    trace!(aircraft = %holder, resource = %denied.resource, blocker = %denied.blocker, "denied");
                    return Err(denied);
                }
            }
        }

        self.stats.granted += 1;
        trace!(aircraft = %holder, new = acquired.len(), tick = %now, "granted");
        Ok(Grant { acquired })
    }

    /// Reserve `[start, end)` on `resource` for `holder`.  A window the
    /// holder already has that overlaps the request is stretched to `end`
    /// rather than duplicated.
    fn try_acquire(
        &mut self,
        resource: Resource,
        holder: AircraftId,
        priority: Priority,
        start: Tick,
        end: Tick,
    ) -> Result<Acquired, Denied> {
        if self.touches_zone(resource) {
            if resource == Resource::Runway {
                if let Some(blocker) = self.runway_occupant(holder) {
                    return Err(Denied { resource, blocker });
                }
            }
            if let Some(blocker) = self.zone_blocker(holder, start, end) {
                return Err(Denied { resource, blocker });
            }
        }

        let slots = self.table.entry(resource).or_default();
        if let Some(other) = slots.iter().find(|r| r.holder != holder && r.overlaps(start, end)) {
            return Err(Denied { resource, blocker: other.holder });
        }
        // Own windows are disjoint and start no later than `start`, so at
        // most one of them overlaps.
        if let Some(own) = slots.iter_mut().find(|r| r.holder == holder && r.overlaps(start, end)) {
            if own.end >= end {
                return Ok(Acquired::Held);
            }
            let prev_end = own.end;
            own.end = end;
            trace!(aircraft = %holder, resource = %resource, from = %prev_end, to = %end, "lease extended");
            return Ok(Acquired::Extended(prev_end));
        }
        slots.push(Reservation { resource, holder, start, end, priority });
        self.held.entry(holder).or_default().insert(resource);
        Ok(Acquired::New)
    }

    /// Undo an extension made earlier in a batch that was then refused.
    fn shorten(&mut self, resource: Resource, holder: AircraftId, end: Tick, prev_end: Tick) {
        if let Some(slots) = self.table.get_mut(&resource) {
            if let Some(own) = slots.iter_mut().find(|r| r.holder == holder && r.end == end) {
                own.end = prev_end;
            }
        }
    }

    fn touches_zone(&self, resource: Resource) -> bool {
        match resource {
            Resource::Runway     => true,
            Resource::Node(n)    => self.zone.contains_node(n),
            Resource::Edge(k)    => self.zone.contains_edge(k),
            Resource::Section(_) => false,
        }
    }

    /// Another holder with a window overlapping `[start, end)` on any
    /// runway-zone resource.
    fn zone_blocker(&self, holder: AircraftId, start: Tick, end: Tick) -> Option<AircraftId> {
        let zone_keys = self
            .zone
            .nodes
            .iter()
            .map(|&n| Resource::Node(n))
            .chain(self.zone.edges.iter().map(|&k| Resource::Edge(k)))
            .chain(std::iter::once(Resource::Runway));

        for key in zone_keys {
            if let Some(slots) = self.table.get(&key) {
                if let Some(r) = slots.iter().find(|r| r.holder != holder && r.overlaps(start, end)) {
                    return Some(r.holder);
                }
            }
        }
        None
    }

    // ── Release ───────────────────────────────────────────────────────────

    /// Drop `holder`'s reservations on `resource`.  A no-op when it holds
    /// none.  Also sweeps windows on `resource` that ended before `now`.
    pub fn release(&mut self, resource: Resource, holder: AircraftId, now: Tick) -> bool {
        let removed = self.remove_matching(resource, holder, |_| true);
        if let Some(slots) = self.table.get_mut(&resource) {
            let mut lapsed: Vec<AircraftId> = Vec::new();
            slots.retain(|r| {
                let keep = !r.is_expired(now);
                if !keep {
                    lapsed.push(r.holder);
                }
                keep
            });
            let remaining: BTreeSet<AircraftId> = slots.iter().map(|r| r.holder).collect();
            if slots.is_empty() {
                self.table.remove(&resource);
            }
            for h in lapsed.into_iter().filter(|h| !remaining.contains(h)) {
                self.unlink(resource, h);
            }
        }
        if removed > 0 {
            self.stats.released += removed;
            trace!(aircraft = %holder, resource = %resource, tick = %now, "released");
        }
        removed > 0
    }

    /// Drop everything `holder` has.  Returns the number of reservations
    /// removed.
    pub fn release_all(&mut self, holder: AircraftId, now: Tick) -> usize {
        let Some(resources) = self.held.remove(&holder) else {
            return 0;
        };
        let mut removed = 0usize;
        for resource in resources {
            if let Some(slots) = self.table.get_mut(&resource) {
                let before = slots.len();
                slots.retain(|r| r.holder != holder);
                removed += before - slots.len();
                if slots.is_empty() {
                    self.table.remove(&resource);
                }
            }
        }
        self.stats.released += removed as u64;
        debug!(aircraft = %holder, removed, tick = %now, "released all");
        removed
    }

    /// Release everything and erase every trace of `holder` (registration,
    /// occupancy, proposals it sent or received).
    pub fn forget(&mut self, holder: AircraftId, now: Tick) {
        self.release_all(holder, now);
        self.holders.remove(&holder);
        self.occupancy.remove(&holder);
        self.proposals.retain(|_, p| p.sender != holder && p.target != holder);
    }

    /// Remove every reservation whose window ended at or before `now`.
    pub fn purge_expired(&mut self, now: Tick) -> usize {
        let mut purged: Vec<(Resource, AircraftId)> = Vec::new();
        self.table.retain(|resource, slots| {
            slots.retain(|r| {
                let keep = !r.is_expired(now);
                if !keep {
                    purged.push((*resource, r.holder));
                }
                keep
            });
            !slots.is_empty()
        });
        for (resource, holder) in &purged {
            let still_held = self
                .table
                .get(resource)
                .is_some_and(|s| s.iter().any(|r| r.holder == *holder));
            if !still_held {
                self.unlink(*resource, *holder);
            }
        }
        purged.len()
    }

    fn remove_matching(
        &mut self,
        resource: Resource,
        holder: AircraftId,
        pred: impl Fn(&Reservation) -> bool,
    ) -> u64 {
        let Some(slots) = self.table.get_mut(&resource) else {
            return 0;
        };
        let before = slots.len();
        slots.retain(|r| !(r.holder == holder && pred(r)));
        let removed = (before - slots.len()) as u64;
        let still_held = slots.iter().any(|r| r.holder == holder);
        if slots.is_empty() {
            self.table.remove(&resource);
        }
        if !still_held {
            self.unlink(resource, holder);
        }
        removed
    }

    fn unlink(&mut self, resource: Resource, holder: AircraftId) {
        if let Some(set) = self.held.get_mut(&holder) {
            set.remove(&resource);
            if set.is_empty() {
                self.held.remove(&holder);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// The holder whose window on `resource` contains `now`.
    pub fn holder_of(&self, resource: Resource, now: Tick) -> Option<AircraftId> {
        self.table
            .get(&resource)?
            .iter()
            .find(|r| r.is_active(now))
            .map(|r| r.holder)
    }

    pub fn holds(&self, holder: AircraftId, resource: Resource, now: Tick) -> bool {
        self.table
            .get(&resource)
            .is_some_and(|s| s.iter().any(|r| r.holder == holder && r.is_active(now)))
    }

    /// Every resource `holder` has a reservation on, in resource order.
    pub fn held_by(&self, holder: AircraftId) -> BTreeSet<Resource> {
        self.held.get(&holder).cloned().unwrap_or_default()
    }

    /// All windows currently stored for `resource`.
    pub fn reservations(&self, resource: Resource) -> &[Reservation] {
        self.table.get(&resource).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of reservations active at `now`, across all resources.
    pub fn active_count(&self, now: Tick) -> usize {
        self.table
            .values()
            .map(|s| s.iter().filter(|r| r.is_active(now)).count())
            .sum()
    }

    // ── Arbitration ───────────────────────────────────────────────────────

    /// Settle a dispute over `resource` between `a` and `b`.
    ///
    /// Higher priority wins; equal priorities go to the earlier-registered
    /// holder.  The loser's live reservations on `resource` are evicted.
    pub fn resolve_conflict_by_controller(
        &mut self,
        resource: Resource,
        a: AircraftId,
        b: AircraftId,
        now: Tick,
    ) -> AircraftId {
        let (winner, loser) = if self.rank(a) <= self.rank(b) { (a, b) } else { (b, a) };
        if winner == loser {
            return winner;
        }
        let evicted = self.remove_matching(resource, loser, |r| !r.is_expired(now));
        if evicted > 0 {
            self.stats.evicted += evicted;
        }
        debug!(
            resource = %resource,
            winner = %winner,
            loser = %loser,
            evicted,
            "controller arbitration"
        );
        winner
    }

    // ── Negotiation ───────────────────────────────────────────────────────

    /// Post a proposal from `sender` to `target`.  An identical pending
    /// proposal is reused rather than duplicated.
    pub fn create_conflict_proposal(
        &mut self,
        sender: AircraftId,
        target: AircraftId,
        kind: ProposalKind,
        params: ProposalParams,
        now: Tick,
    ) -> ProposalId {
        if let Some(existing) = self
            .proposals
            .values()
            .find(|p| p.sender == sender && p.target == target && p.kind == kind && p.is_pending())
        {
            return existing.id;
        }
        let id = ProposalId(self.next_proposal);
        self.next_proposal += 1;
        self.proposals.insert(
            id,
            ConflictProposal {
                id,
                sender,
                target,
                kind,
                params,
                created: now,
                status: ProposalStatus::Pending,
            },
        );
        debug!(proposal = %id, sender = %sender, target = %target, ?kind, "proposal sent");
        id
    }

    /// Pending proposals addressed to `target`, oldest first.
    pub fn proposals_for(&self, target: AircraftId) -> Vec<ConflictProposal> {
        self.proposals
            .values()
            .filter(|p| p.target == target && p.is_pending())
            .copied()
            .collect()
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&ConflictProposal> {
        self.proposals.get(&id)
    }

    /// Accept a pending proposal.  A priority swap takes effect immediately.
    pub fn accept(&mut self, id: ProposalId) -> bool {
        let Some(p) = self.settle(id, ProposalStatus::Accepted) else {
            return false;
        };
        if p.kind == ProposalKind::PrioritySwap {
            self.swap_priorities(p.sender, p.target);
        }
        true
    }

    pub fn reject(&mut self, id: ProposalId) -> bool {
        self.settle(id, ProposalStatus::Rejected).is_some()
    }

    fn settle(&mut self, id: ProposalId, status: ProposalStatus) -> Option<ConflictProposal> {
        let p = self.proposals.get_mut(&id).filter(|p| p.is_pending())?;
        p.status = status;
        debug!(proposal = %id, ?status, "proposal settled");
        Some(*p)
    }

    /// Remove and return settled proposals `sender` posted, oldest first.
    pub fn take_verdicts(&mut self, sender: AircraftId) -> Vec<ConflictProposal> {
        let ids: Vec<ProposalId> = self
            .proposals
            .values()
            .filter(|p| p.sender == sender && !p.is_pending())
            .map(|p| p.id)
            .collect();
        ids.iter().filter_map(|id| self.proposals.remove(id)).collect()
    }

    pub fn pending_proposals(&self) -> usize {
        self.proposals.values().filter(|p| p.is_pending()).count()
    }
}
