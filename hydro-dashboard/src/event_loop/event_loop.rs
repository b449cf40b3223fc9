use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{never, select, Receiver};
use log::*;
use rumqttc::{Client, Connection, Event, Packet, QoS};
use software_defined_hydroponics::chart::renderer::ChartRenderer;
use software_defined_hydroponics::state::feed::{FeedError, Query, Snapshot};
use software_defined_hydroponics::state::traits::{RealtimeFeed, Subscription};
use software_defined_hydroponics::utils::time::Clock;

use crate::dashboard::dashboard::Dashboard;
use crate::event_loop::handlers::{handle_command, DashboardCommand};
use crate::mqtt::mqtt::Topics;
use crate::view::view::DashboardView;

/// Drives the broker connection on its own thread, handing every publish to `on_message`
/// as `(topic, payload)`. Subscriptions are (re)issued on every connect.
pub fn create_event_loop<F>(
    client: Client,
    mut connection: Connection,
    topics: Topics,
    mut on_message: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnMut(&str, &str) + Send + 'static,
{
    info!("About to start the MQTT client");

    thread::Builder::new().name("mqtt".into()).spawn(move || {
        info!("MQTT Listening for messages");

        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match std::str::from_utf8(&publish.payload) {
                        Ok(payload) => {
                            info!("[{}] Received: {}", publish.topic, payload);
                            on_message(&publish.topic, payload);
                        }
                        Err(_) => {
                            warn!("Received non-UTF8 payload on topic: {}", publish.topic);
                        }
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT Connected");
                    for topic in topics.inbound() {
                        match client.try_subscribe(topic, QoS::AtLeastOnce) {
                            Ok(()) => info!("Subscribed to topic \"{}\"", topic),
                            Err(e) => error!("Failed to subscribe to topic \"{}\": {:?}", topic, e),
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("MQTT Disconnected");
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT Error: {:?}", e);
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }

        warn!("Connection closed - this shouldn't happen!");
    })
}

enum FeedEvent {
    Latest(Result<Snapshot, FeedError>),
    History(Result<Snapshot, FeedError>),
    Pump(Result<Snapshot, FeedError>),
    Command(DashboardCommand),
}

/// Single consumer for everything the dashboard reacts to.
///
/// Deliveries from the three feed subscriptions and user commands are handled one at a
/// time on the calling thread, so the dashboard never needs a lock. The history
/// subscription is dropped after its first delivery.
pub struct Dispatcher {
    latest: Option<Subscription>,
    history: Option<Subscription>,
    pump: Option<Subscription>,
    commands: Receiver<DashboardCommand>,
    export_dir: PathBuf,
    on_response: Option<Box<dyn FnMut(&str)>>,
}

impl Dispatcher {
    pub fn subscribe<F, V, R, C>(
        dashboard: &Dashboard<F, V, R, C>,
        feed: &F,
        commands: Receiver<DashboardCommand>,
        export_dir: PathBuf,
    ) -> Result<Self, FeedError>
    where
        F: RealtimeFeed + Clone,
        V: DashboardView,
        R: ChartRenderer,
        C: Clock,
    {
        let paths = dashboard.paths();
        let monitoring = Query::path(paths.monitoring.clone());

        Ok(Self {
            latest: Some(feed.subscribe(monitoring.clone().limit_to_last(1))?),
            history: Some(feed.subscribe(monitoring.limit_to_last(dashboard.chart_capacity()))?),
            pump: Some(feed.subscribe(Query::path(paths.pump.clone()))?),
            commands,
            export_dir,
            on_response: None,
        })
    }

    /// Where command responses go (e.g. a broker topic)
    pub fn on_response(mut self, respond: impl FnMut(&str) + 'static) -> Self {
        self.on_response = Some(Box::new(respond));
        self
    }

    /// Blocks until the command channel closes
    pub fn run<F, V, R, C>(&mut self, dashboard: &mut Dashboard<F, V, R, C>)
    where
        F: RealtimeFeed + Clone,
        V: DashboardView,
        R: ChartRenderer,
        C: Clock,
    {
        // history first, so the charts exist before the first live point arrives
        self.run_pending(dashboard);

        loop {
            let closed = never();
            let latest = self.latest.as_ref().unwrap_or(&closed);
            let history = self.history.as_ref().unwrap_or(&closed);
            let pump = self.pump.as_ref().unwrap_or(&closed);

            let event = select! {
                recv(history) -> msg => msg.ok().map(FeedEvent::History).ok_or("history"),
                recv(latest) -> msg => msg.ok().map(FeedEvent::Latest).ok_or("latest"),
                recv(pump) -> msg => msg.ok().map(FeedEvent::Pump).ok_or("pump"),
                recv(self.commands) -> msg => match msg {
                    Ok(command) => Ok(FeedEvent::Command(command)),
                    Err(_) => {
                        info!("Command channel closed, stopping dispatcher");
                        return;
                    }
                },
            };

            match event {
                Ok(event) => self.dispatch(dashboard, event),
                Err(name) => self.close(name),
            }
        }
    }

    /// Handles everything already queued without blocking. Returns how many events ran.
    pub fn run_pending<F, V, R, C>(&mut self, dashboard: &mut Dashboard<F, V, R, C>) -> usize
    where
        F: RealtimeFeed + Clone,
        V: DashboardView,
        R: ChartRenderer,
        C: Clock,
    {
        let mut handled = 0;
        loop {
            let event = if let Some(Ok(msg)) = self.history.as_ref().map(|rx| rx.try_recv()) {
                FeedEvent::History(msg)
            } else if let Some(Ok(msg)) = self.latest.as_ref().map(|rx| rx.try_recv()) {
                FeedEvent::Latest(msg)
            } else if let Some(Ok(msg)) = self.pump.as_ref().map(|rx| rx.try_recv()) {
                FeedEvent::Pump(msg)
            } else if let Ok(command) = self.commands.try_recv() {
                FeedEvent::Command(command)
            } else {
                return handled;
            };

            self.dispatch(dashboard, event);
            handled += 1;
        }
    }

    fn dispatch<F, V, R, C>(&mut self, dashboard: &mut Dashboard<F, V, R, C>, event: FeedEvent)
    where
        F: RealtimeFeed + Clone,
        V: DashboardView,
        R: ChartRenderer,
        C: Clock,
    {
        match event {
            FeedEvent::Latest(Ok(snapshot)) => {
                dashboard.on_latest(&snapshot);
            }
            FeedEvent::History(Ok(snapshot)) => {
                self.history = None;
                dashboard.on_history(&snapshot);
            }
            FeedEvent::Pump(Ok(snapshot)) => {
                dashboard.on_pump_state(&snapshot);
            }
            FeedEvent::Latest(Err(e)) | FeedEvent::Pump(Err(e)) => {
                dashboard.on_feed_error(&e);
            }
            FeedEvent::History(Err(e)) => {
                self.history = None;
                dashboard.on_feed_error(&e);
            }
            FeedEvent::Command(command) => {
                let response = handle_command(command, dashboard, &self.export_dir);
                if let Some(respond) = self.on_response.as_mut() {
                    respond(&response);
                }
            }
        }
    }

    fn close(&mut self, name: &str) {
        warn!("Subscription \"{}\" closed", name);
        match name {
            "history" => self.history = None,
            "latest" => self.latest = None,
            _ => self.pump = None,
        }
    }
}
