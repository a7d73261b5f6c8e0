//! Reaction handlers of the reference cluster.

use crate::engine::{ReactionContext, ReactionRegistry};
use crate::model::{ActorId, ArgValue, CommandKind, GroupId, LogEntry, args};

use super::diff::ClusterDiff;

type Ctx<'a> = ReactionContext<'a, ClusterDiff>;

fn acting_group<'a>(ctx: &'a Ctx<'_>) -> Option<&'a GroupId> {
    match &ctx.actor.id {
        ActorId::Group(group) => Some(group),
        ActorId::Peer(_) => None,
    }
}

/// The observer picked by a prepare accepts the joiner.
fn accept_prepared(ctx: &Ctx<'_>) -> Vec<LogEntry> {
    let Some(me) = acting_group(ctx) else {
        return Vec::new();
    };
    ctx.diff
        .prepared
        .iter()
        .filter(|(_, observer)| *observer == me)
        .map(|(joiner, observer)| {
            LogEntry::new(CommandKind::AcceptJoinCluster)
                .with_arg(args::ACCEPTED_OBSERVER, ArgValue::Group(observer.clone()))
                .with_arg(args::ACCEPTED_JOINER, ArgValue::Group(joiner.clone()))
        })
        .collect()
}

/// Once accepted, the observer announces the joiner.
fn notify_accepted(ctx: &Ctx<'_>) -> Vec<LogEntry> {
    let Some(me) = acting_group(ctx) else {
        return Vec::new();
    };
    ctx.diff
        .accepted
        .iter()
        .filter(|(_, observer)| *observer == me)
        .map(|(joiner, observer)| {
            LogEntry::new(CommandKind::NotifyJoinCluster)
                .with_arg(args::OBSERVER, ArgValue::Group(observer.clone()))
                .with_arg(args::JOINER, ArgValue::Group(joiner.clone()))
        })
        .collect()
}

/// When an observer leaves mid-join, the lowest remaining group aborts the
/// orphaned joins.
///
/// If the observer was the only member, no group is left to write the abort
/// and the joiner stays out for good, along with its peers. The departing
/// group cannot write it either: a non-member may only abort its own join.
/// Workloads avoid this by holding group departures until the cluster has
/// settled (see [`super::workload::add_group_departure`]).
fn abort_orphans(ctx: &Ctx<'_>) -> Vec<LogEntry> {
    let Some(me) = acting_group(ctx) else {
        return Vec::new();
    };
    if ctx.new.groups().first() != Some(me) {
        return Vec::new();
    }
    ctx.diff
        .orphaned_joins
        .iter()
        .map(|joiner| {
            LogEntry::new(CommandKind::AbortJoinCluster)
                .with_arg(args::ID, ArgValue::Group(joiner.clone()))
        })
        .collect()
}

/// An aborted joiner starts over.
fn rejoin(ctx: &Ctx<'_>) -> Vec<LogEntry> {
    let Some(me) = acting_group(ctx) else {
        return Vec::new();
    };
    let aborted = ctx.entry.group_arg(args::ID) == Some(me);
    if !aborted || ctx.new.is_joined_group(me) || ctx.new.join_pending(me) {
        return Vec::new();
    }
    vec![
        LogEntry::new(CommandKind::PrepareJoinCluster)
            .with_arg(args::JOINER, ArgValue::Group(me.clone())),
    ]
}

/// Registry with every reference handler.
pub fn reference_reactions() -> ReactionRegistry<ClusterDiff> {
    ReactionRegistry::new()
        .register(CommandKind::PrepareJoinCluster, accept_prepared)
        .register(CommandKind::AcceptJoinCluster, notify_accepted)
        .register(CommandKind::GroupLeaveCluster, abort_orphans)
        .register(CommandKind::AbortJoinCluster, rejoin)
}
