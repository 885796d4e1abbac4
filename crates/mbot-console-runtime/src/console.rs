//! The console event loop.
//!
//! One task owns every piece of state. `tokio::select!` multiplexes the
//! heartbeat timer, the map polling schedule, inbound telemetry, operator
//! commands, and shutdown; each handler runs to completion before the next
//! event is taken, so no state is shared and nothing is locked.

use std::collections::BTreeMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use mbot_console_core::messages::{self, Telemetry};
use mbot_console_core::projection::{particle_points, project_click, project_pose};
use mbot_console_core::status::{ConnectionStatus, DisplayToggles, StatusPanel, UNKNOWN_HOSTNAME};
use mbot_console_core::{
    ChannelId, ClickedCell, Confirm, ConnectivityState, GridCell, MapSnapshot, RobotPose,
    SlamModeStateMachine, TransitionOutcome,
};
use tokio::sync::mpsc;

use crate::client::{ChannelClient, StreamEvent};
use crate::commands::{CommandRequest, OperatorCommand};
use crate::export;
use crate::heartbeat::ConnectivityMonitor;
use crate::map_poll::{self, MapPollingScheduler};
use crate::scene::{Scene, Surface};
use crate::subscriptions::{InboundMessage, SubscriptionManager};

pub struct ConsoleOptions {
    pub heartbeat_period: Duration,
    pub map_poll_period: Duration,
    pub toggles: DisplayToggles,
    pub surface: Surface,
    pub export_dir: PathBuf,
}

pub struct Console<C, S, F> {
    client: C,
    scene: S,
    confirm: F,
    monitor: ConnectivityMonitor,
    subscriptions: SubscriptionManager,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
    slam: SlamModeStateMachine,
    map_poll: MapPollingScheduler,
    hostname: String,
    pose: Option<RobotPose>,
    robot_cell: GridCell,
    clicked: Option<ClickedCell>,
    toggles: DisplayToggles,
    map: Option<MapSnapshot>,
    export_dir: PathBuf,
}

impl<C: ChannelClient, S: Scene, F: Confirm> Console<C, S, F> {
    pub fn new(client: C, mut scene: S, confirm: F, options: ConsoleOptions) -> Self {
        scene.create_scene(options.surface);
        scene.toggle_robot_view(options.toggles.robot);
        let (tx, inbound) = mpsc::unbounded_channel();
        Self {
            client,
            scene,
            confirm,
            monitor: ConnectivityMonitor::new(options.heartbeat_period, &ChannelId::ALL),
            subscriptions: SubscriptionManager::new(tx),
            inbound,
            slam: SlamModeStateMachine::new(),
            map_poll: MapPollingScheduler::new(options.map_poll_period),
            hostname: UNKNOWN_HOSTNAME.to_string(),
            pose: None,
            robot_cell: GridCell::default(),
            clicked: None,
            toggles: options.toggles,
            map: None,
            export_dir: options.export_dir,
        }
    }

    pub fn connectivity(&self) -> &ConnectivityState {
        self.monitor.state()
    }

    pub fn slam(&self) -> &SlamModeStateMachine {
        &self.slam
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn status(&self) -> StatusPanel {
        StatusPanel {
            hostname: self.hostname.clone(),
            connection: ConnectionStatus::from_state(self.monitor.state()),
            pose: self.pose,
            robot_cell: self.robot_cell,
            clicked: self.clicked,
            slam_mode: self.slam.mode(),
            slam_controls: self.slam_controls(),
            toggles: self.toggles,
        }
    }

    // ─── Event loop ───────────────────────────────────────────────

    /// Run until `shutdown` resolves, the operator quits, or command input
    /// closes. Every active subscription is released on the way out.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<CommandRequest>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        let mut heartbeat = self.monitor.ticker();

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = heartbeat.tick() => self.heartbeat().await,
                () = self.map_poll.due() => self.refresh_map().await,
                Some(msg) = self.inbound.recv() => self.handle_inbound(msg),
                request = commands.recv() => {
                    let Some(request) = request else {
                        tracing::info!("command input closed");
                        break;
                    };
                    let flow = self.handle_command(request.command).await;
                    // Reader may be gone already.
                    let _ = request.done.send(());
                    if flow.is_break() {
                        break;
                    }
                }
            }
        }
        self.teardown().await;
    }

    pub async fn teardown(&mut self) {
        self.map_poll.cancel();
        self.subscriptions.teardown(&self.client).await;
        tracing::info!("console stopped");
    }

    // ─── Connectivity & subscriptions ─────────────────────────────

    fn user_enabled(&self, channel: ChannelId) -> bool {
        match channel {
            ChannelId::Pose => self.toggles.robot,
            ChannelId::Lidar => self.toggles.lasers,
            ChannelId::Particle => self.toggles.particles,
            ChannelId::Path | ChannelId::SlamMode => true,
            ChannelId::SlamMap => false,
        }
    }

    /// Channels that should be subscribed right now.
    pub fn desired(&self) -> BTreeMap<ChannelId, bool> {
        let state = self.monitor.state();
        ChannelId::SUBSCRIBABLE
            .into_iter()
            .map(|ch| (ch, self.user_enabled(ch) && state.is_available(ch)))
            .collect()
    }

    async fn reconcile(&mut self) {
        let desired = self.desired();
        self.subscriptions.reconcile(&self.client, &desired).await;
    }

    pub async fn heartbeat(&mut self) {
        let change = self.monitor.poll(&self.client).await;
        if change.reconnected {
            // New robot session: nothing from the old one can be trusted.
            self.slam.reset();
            self.map_poll.cancel();
            self.subscriptions.teardown(&self.client).await;
        }
        if change.connected == Some(true) {
            self.refresh_hostname().await;
        }
        if !change.is_empty() || self.subscriptions.needs_reconcile() {
            self.reconcile().await;
        }
    }

    async fn refresh_hostname(&mut self) {
        match self.client.read_hostname().await {
            Ok(name) => {
                tracing::info!("connected to {name}");
                self.hostname = name;
            }
            Err(e) => tracing::warn!("could not get hostname: {e}"),
        }
    }

    async fn refresh_map(&mut self) {
        let Some(snapshot) = map_poll::fetch_map(&self.client, &mut self.scene).await else {
            return;
        };
        let previous = self.map.as_ref().map(MapSnapshot::header);
        if previous.is_some_and(|header| header != snapshot.header()) {
            // Cells from the old grid mean nothing on the new one.
            self.clicked = None;
            self.robot_cell = GridCell::default();
            if let Some(cell) = self.pose.and_then(|pose| project_pose(pose, &self.scene).cell) {
                self.robot_cell = cell;
            }
        }
        self.map = Some(snapshot);
    }

    // ─── Telemetry ────────────────────────────────────────────────

    pub fn handle_inbound(&mut self, msg: InboundMessage) {
        // Late delivery from a stream that was just released.
        if !self.subscriptions.is_active(msg.channel) {
            tracing::debug!("dropping message on inactive channel {}", msg.channel);
            return;
        }
        let payload = match msg.event {
            StreamEvent::Message(payload) => payload,
            StreamEvent::Closed => {
                if self.subscriptions.stream_closed(msg.channel) {
                    tracing::warn!("{} stream closed by bridge, resubscribing on next heartbeat", msg.channel);
                }
                return;
            }
        };
        let telemetry = match messages::decode(msg.channel, payload) {
            Ok(telemetry) => telemetry,
            Err(e) => {
                tracing::warn!("dropping message: {e}");
                return;
            }
        };

        match telemetry {
            Telemetry::Pose(pose) => {
                let projected = project_pose(pose, &self.scene);
                self.pose = Some(pose);
                self.scene.update_robot(pose.x, pose.y, pose.theta);
                if let Some(cell) = projected.cell {
                    self.robot_cell = cell;
                }
            }
            Telemetry::Lidar(scan) => self.scene.draw_lasers(&scan.ranges, &scan.thetas),
            Telemetry::Particles(set) => self.scene.draw_particles(&particle_points(&set)),
            Telemetry::Path(path) => self.scene.draw_path(&path.path),
            Telemetry::SlamMode(reported) => {
                if let Some(mode) = self.slam.apply_reported(reported) {
                    tracing::info!("robot reports SLAM mode {mode}");
                    self.map_poll.on_mode_change(mode);
                }
            }
        }
    }

    // ─── Operator commands ────────────────────────────────────────

    pub async fn handle_command(&mut self, command: OperatorCommand) -> ControlFlow<()> {
        match command {
            OperatorCommand::ToggleLocalization
            | OperatorCommand::ToggleMapping
            | OperatorCommand::ResetMap
            | OperatorCommand::SetSlamMode(_) => self.slam_request(command).await,
            OperatorCommand::SaveMap => {
                self.save_map();
            }
            OperatorCommand::ToggleRobot => self.toggle_robot().await,
            OperatorCommand::ToggleLasers => self.toggle_lasers().await,
            OperatorCommand::ToggleParticles => self.toggle_particles().await,
            OperatorCommand::Click(pixel) => self.click(pixel),
            OperatorCommand::Status => println!("{}", self.status().render()),
            OperatorCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// SLAM controls are offered only while the robot publishes its mode.
    fn slam_controls(&self) -> bool {
        self.monitor.state().is_available(ChannelId::SlamMode)
    }

    async fn slam_request(&mut self, command: OperatorCommand) {
        if !self.slam_controls() {
            tracing::warn!("SLAM controls unavailable: {} is not live", ChannelId::SlamMode);
            return;
        }
        let outcome = match command {
            OperatorCommand::ToggleLocalization => self.slam.toggle_localization(),
            OperatorCommand::ToggleMapping => self.slam.toggle_mapping(&self.confirm),
            OperatorCommand::ResetMap => self.slam.reset_map(&self.confirm),
            OperatorCommand::SetSlamMode(target) => self.slam.request(target, &self.confirm),
            _ => return,
        };

        match outcome {
            TransitionOutcome::Issued(cmd) => {
                tracing::info!("requesting SLAM {} (clear map: {})", cmd.mode, cmd.clear_map);
                if let Err(e) = self.client.reset_slam(cmd.mode, cmd.clear_map).await {
                    tracing::warn!("SLAM reset failed: {e}");
                }
                self.map_poll.on_mode_change(self.slam.mode());
            }
            TransitionOutcome::Declined => tracing::info!("declined; SLAM mode unchanged"),
            TransitionOutcome::Unchanged => tracing::debug!("SLAM already in requested mode"),
            TransitionOutcome::Unsupported { from, to } => {
                tracing::warn!("no SLAM transition from {from} to {to}")
            }
        }
    }

    async fn toggle_robot(&mut self) {
        self.toggles.robot = !self.toggles.robot;
        self.scene.toggle_robot_view(self.toggles.robot);
        self.reconcile().await;
    }

    async fn toggle_lasers(&mut self) {
        if !self.toggles.lasers && !self.monitor.state().is_available(ChannelId::Lidar) {
            tracing::warn!("cannot draw lasers: {} is not live", ChannelId::Lidar);
            return;
        }
        self.toggles.lasers = !self.toggles.lasers;
        if !self.toggles.lasers {
            self.scene.clear_lasers();
        }
        self.reconcile().await;
    }

    async fn toggle_particles(&mut self) {
        if !self.toggles.particles && !self.monitor.state().is_available(ChannelId::Particle) {
            tracing::warn!("cannot draw particles: {} is not live", ChannelId::Particle);
            return;
        }
        self.toggles.particles = !self.toggles.particles;
        if !self.toggles.particles {
            self.scene.clear_particles();
        }
        self.reconcile().await;
    }

    fn click(&mut self, pixel: Option<(f64, f64)>) {
        self.clicked = project_click(pixel, &self.scene);
    }

    fn save_map(&self) -> Option<PathBuf> {
        let Some(snapshot) = &self.map else {
            tracing::warn!("no map loaded, nothing to save");
            return None;
        };
        match export::write_snapshot(&self.export_dir, &self.hostname, snapshot, Utc::now()) {
            Ok(path) => {
                tracing::info!("map saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("map export failed: {e}");
                None
            }
        }
    }
}
