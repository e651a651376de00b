use std::mem;
use std::rc::Rc;
use std::cell::RefCell;
use std::time::{Duration, Instant};
use std::iter::FromIterator;
use std::collections::{HashMap, HashSet};

use futures::{Future, Stream};
use tokio_timer::Timer;

use errors::{Error, ErrorKind, Result};
use client::{BrokerRef, Client, ConsumerGroupAssignment, ConsumerGroupMember,
             ConsumerGroupProtocol, Generation, KafkaClient, Metadata, StaticBoxFuture};
use consumer::{Assignment, Schema, Subscription, Subscriptions, CONSUMER_PROTOCOL,
               PartitionAssignor};

/// Manages the coordination process with the consumer coordinator.
pub trait Coordinator {
    /// Join the consumer group.
    fn join_group(&mut self) -> JoinGroup;

    /// Leave the current consumer group.
    fn leave_group(&mut self) -> LeaveGroup;
}

pub type JoinGroup = StaticBoxFuture;

pub type LeaveGroup = StaticBoxFuture;

/// Manages the coordination process with the consumer coordinator.
pub struct ConsumerCoordinator<'a> {
    inner: Rc<Inner<'a>>,
}

struct Inner<'a> {
    client: KafkaClient<'a>,
    group_id: String,
    subscriptions: Rc<RefCell<Subscriptions<'a>>>,
    session_timeout: Duration,
    rebalance_timeout: Duration,
    heartbeat_interval: Duration,
    retry_backoff: Duration,
    assignors: Vec<Box<PartitionAssignor>>,
    state: Rc<RefCell<State>>,
    timer: Rc<Timer>,
}

enum State {
    /// the client is not part of a group
    Unjoined,
    /// the client has begun rebalancing
    Rebalancing,
    /// the client has joined and is sending heartbeats
    Stable {
        coordinator: BrokerRef,
        generation: Generation,
    },
}

impl State {
    pub fn member_id(&self) -> Option<String> {
        if let State::Stable { ref generation, .. } = *self {
            Some(generation.member_id.clone())
        } else {
            None
        }
    }

    pub fn rebalance(&mut self) -> Self {
        mem::replace(self, State::Rebalancing)
    }

    pub fn joined(&mut self, coordinator: BrokerRef, generation: Generation) -> State {
        mem::replace(self,
                     State::Stable {
                         coordinator: coordinator,
                         generation: generation,
                     })
    }

    pub fn leave(&mut self) -> Self {
        mem::replace(self, State::Unjoined)
    }
}

impl<'a> ConsumerCoordinator<'a> {
    pub fn new(client: KafkaClient<'a>,
               group_id: String,
               subscriptions: Rc<RefCell<Subscriptions<'a>>>,
               session_timeout: Duration,
               rebalance_timeout: Duration,
               heartbeat_interval: Duration,
               retry_backoff: Duration,
               assignors: Vec<Box<PartitionAssignor>>,
               timer: Rc<Timer>)
               -> Self {
        ConsumerCoordinator {
            inner: Rc::new(Inner {
                               client: client,
                               group_id: group_id,
                               subscriptions: subscriptions,
                               session_timeout: session_timeout,
                               rebalance_timeout: rebalance_timeout,
                               heartbeat_interval: heartbeat_interval,
                               retry_backoff: retry_backoff,
                               assignors: assignors,
                               timer: timer,
                               state: Rc::new(RefCell::new(State::Unjoined)),
                           }),
        }
    }
}

impl<'a> Inner<'a>
    where Self: 'static
{
    fn group_protocols(&self) -> Vec<ConsumerGroupProtocol> {
        let topics: Vec<String> = self.subscriptions
            .borrow()
            .topics()
            .iter()
            .map(|topic_name| String::from(*topic_name))
            .collect();

        self.assignors
            .iter()
            .flat_map(move |assignor| {
                let subscription: Subscription =
                    assignor.subscription(topics.iter().map(|topic_name| topic_name.as_str().into()).collect());

                Schema::serialize(&subscription)
                    .map_err(|err| warn!("fail to serialize subscription, {}", err))
                    .ok()
                    .map(|metadata| {
                             ConsumerGroupProtocol {
                                 name: assignor.name().to_owned(),
                                 metadata: metadata,
                             }
                         })
            })
            .collect()
    }

    fn perform_assignment(&self,
                          metadata: &Metadata,
                          group_protocol: &str,
                          members: &[ConsumerGroupMember])
                          -> Result<Vec<ConsumerGroupAssignment>> {
        let strategy = group_protocol.parse()?;
        let assignor = self.assignors
            .iter()
            .find(|assigner| assigner.strategy() == strategy)
            .ok_or_else(|| ErrorKind::UnsupportedAssignmentStrategy(group_protocol.to_owned()))?;

        let mut subscripbed_topics = HashSet::new();
        let mut subscriptions = HashMap::new();

        for member in members {
            let subscription: Subscription = Schema::deserialize(member.metadata.as_ref())?;

            subscripbed_topics.extend(subscription.topics.iter().cloned());
            subscriptions.insert(member.member_id.clone(), subscription);
        }

        let assignment = assignor.assign(metadata, subscriptions);

        // a custom assignor may have assigned partitions for topics outside the
        // subscription list; fold those into the group subscription so a
        // subsequent metadata refresh for them doesn't trigger a rebalance.

        let mut assigned_topics = HashSet::new();

        assigned_topics.extend(assignment
                                   .values()
                                   .flat_map(|assignment| {
                                                 assignment.partitions
                                                     .iter()
                                                     .map(|tp| tp.topic_name.clone().into_owned())
                                             }));

        let not_assigned_topics = &subscripbed_topics - &assigned_topics;

        if !not_assigned_topics.is_empty() {
            warn!("The following subscribed topics are not assigned to any members in the group `{}`: {}",
                  self.group_id,
                  Vec::from_iter(not_assigned_topics.iter().cloned())
                      .as_slice()
                      .join(","));
        }

        let newly_added_topics = &assigned_topics - &subscripbed_topics;

        if !newly_added_topics.is_empty() {
            info!("The following not-subscribed topics are assigned to group {}, and their metadata will be fetched from the brokers : {}",
                  self.group_id,
                  Vec::from_iter(newly_added_topics.iter().cloned())
                      .as_slice()
                      .join(","));

            subscripbed_topics.extend(assigned_topics);
        }

        self.subscriptions
            .borrow_mut()
            .group_subscribe(subscripbed_topics.iter());

        let mut group_assignment = Vec::new();

        for (member_id, assignment) in assignment {
            group_assignment.push(ConsumerGroupAssignment {
                                      member_id: member_id,
                                      assignment: Schema::serialize(&assignment)?,
                                  })
        }

        Ok(group_assignment)
    }

    fn synced_group(&self,
                    assignment: Assignment,
                    coordinator: BrokerRef,
                    generation: Generation)
                    -> Result<()> {
        trace!("member `{}` synced up to generation # {} with {} partitions: {:?}",
               generation.member_id,
               generation.generation_id,
               assignment.partitions.len(),
               assignment.partitions);

        self.subscriptions
            .borrow_mut()
            .assign_from_subscribed(assignment.partitions)?;

        self.state
            .borrow_mut()
            .joined(coordinator, generation.clone());

        let client = self.client.clone();

        self.client
            .handle()
            .spawn(self.timer
                       .interval_at(Instant::now() + self.heartbeat_interval,
                                    self.heartbeat_interval)
                       .map_err(Error::from)
                       .for_each(move |_| client.heartbeat(coordinator, generation.clone()))
                       .map_err(|err| {
                                    warn!("fail to send heartbeat, {}", err);
                                }));

        Ok(())
    }

    /// One round trip of the join -> assign -> sync sequence for
    /// `member_id` (empty for a brand new member). Recurses through
    /// `.or_else` (not the call stack) whenever the broker asks for a
    /// rejoin, either because it handed back a member id
    /// (`MemberIdRequired`) or because the generation moved on under us
    /// (`KafkaCode::needs_rejoin`).
    fn join_group_attempt(inner: Rc<Inner<'a>>, member_id: String) -> JoinGroup {
        let client = inner.client.clone();
        let group_id = inner.group_id.clone();
        let session_timeout = inner.session_timeout;
        let rebalance_timeout = inner.rebalance_timeout;
        let group_protocols = inner.group_protocols();

        debug!("member `{}` is joining the `{}` group", member_id, group_id);

        let inner2 = inner.clone();
        let retry_inner = inner.clone();
        let retry_backoff = inner.retry_backoff;
        let timer = inner.timer.clone();
        let state = inner.state.clone();

        let future = client
            .metadata()
            .join(client.group_coordinator(group_id.clone().into()))
            .and_then(move |(metadata, coordinator)| {
                let group_id = group_id.clone();
                let member_id2 = member_id.clone();

                client
                    .join_group(coordinator.as_ref(),
                                group_id.clone().into(),
                                session_timeout,
                                rebalance_timeout,
                                member_id.into(),
                                CONSUMER_PROTOCOL.into(),
                                group_protocols)
                    .and_then(move |consumer_group| {
                        let generation = consumer_group.generation();

                        let group_protocol = match consumer_group.protocol {
                            Some(ref protocol) => protocol.clone(),
                            None => {
                                return JoinGroup::err(ErrorKind::UserError("coordinator selected no group protocol"
                                                                                .to_owned())
                                                           .into())
                            }
                        };

                        let group_assignment = if !consumer_group.is_leader() {
                            debug!("member `{}` joined group `{}` as follower",
                                   member_id2,
                                   group_id);

                            None
                        } else {
                            debug!("member `{}` joined group `{}` as leader",
                                   member_id2,
                                   group_id);

                            match inner2.perform_assignment(&metadata,
                                                             &group_protocol,
                                                             &consumer_group.members) {
                                Ok(group_assignment) => Some(group_assignment),
                                Err(err) => return JoinGroup::err(err),
                            }
                        };

                        let future = client
                            .sync_group(coordinator.as_ref(), generation.clone(), group_assignment)
                            .and_then(move |assignment| {
                                          debug!("group `{}` synced up", group_id);

                                          inner2.synced_group(Schema::deserialize(&assignment[..])?,
                                                              coordinator.as_ref(),
                                                              generation)
                                      });

                        JoinGroup::new(future)
                    })
            })
            .or_else(move |err| {
                match *err.kind() {
                    ErrorKind::MemberIdRequired(ref new_member_id) => {
                        debug!("group requires member id, rejoining as `{}`", new_member_id);

                        ConsumerCoordinator::join_group_attempt(retry_inner.clone(), new_member_id.clone())
                    }
                    ErrorKind::KafkaError(code) if code.needs_rejoin() => {
                        warn!("rejoining group `{}` after {}", retry_inner.group_id, err);

                        JoinGroup::new(timer.sleep(retry_backoff)
                                           .map_err(Error::from)
                                           .and_then(move |_| {
                                              ConsumerCoordinator::join_group_attempt(retry_inner.clone(),
                                                                                      String::new())
                                          }))
                    }
                    _ => {
                        state.borrow_mut().leave();

                        JoinGroup::err(err)
                    }
                }
            });

        JoinGroup::new(future)
    }
}

impl<'a> Coordinator for ConsumerCoordinator<'a>
    where Self: 'static
{
    fn join_group(&mut self) -> JoinGroup {
        self.inner.state.borrow_mut().rebalance();

        let member_id = self.inner.state.borrow().member_id().unwrap_or_default();

        Inner::join_group_attempt(self.inner.clone(), member_id)
    }

    fn leave_group(&mut self) -> LeaveGroup {
        let state = self.inner.state.borrow_mut().leave();

        if let State::Stable {
                   coordinator,
                   generation,
               } = state {
            let group_id = self.inner.group_id.clone();

            debug!("member `{}` is leaving the `{}` group",
                   generation.member_id,
                   group_id);

            LeaveGroup::new(self.inner
                                .client
                                .leave_group(coordinator, generation)
                                .map(|group_id| {
                                         debug!("member has leaved the `{}` group", group_id);
                                     }))
        } else {
            LeaveGroup::err(ErrorKind::UserError("not a member of any group".to_owned()).into())
        }
    }
}

impl<'a> ConsumerCoordinator<'a> {
    /// The coordinator broker and current generation, if the member has
    /// completed `JoinGroup`/`SyncGroup` and hasn't since rebalanced or
    /// left. `consumer::consumer::KafkaConsumer::commit` needs both to
    /// address and tag an `OffsetCommit` request.
    pub fn current_generation(&self) -> Option<(BrokerRef, Generation)> {
        if let State::Stable { coordinator, ref generation } = *self.inner.state.borrow() {
            Some((coordinator, generation.clone()))
        } else {
            None
        }
    }
}
