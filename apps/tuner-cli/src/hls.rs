//! A minimal streaming engine that follows a live HLS playlist.
//!
//! The probe fetches the playlist, validates it, and keeps refreshing it on
//! the target-duration cadence. It reports `ManifestParsed` after the first
//! valid fetch and escalates to a fatal network fault after repeated refresh
//! failures. Reload requests back off and are capped; past the cap the probe
//! reports a fatal fault the player cannot recover from. It decodes nothing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tuner_core::protocol_constants::{
    ENDLIST_TAG, EXTM3U_TAG, STREAM_INF_TAG, TARGET_DURATION_TAG,
};
use tuner_core::{
    EngineEvent, EngineEventSink, EngineFactory, EngineFault, EngineOptions, FaultKind,
    PlaybackDevice, StreamingEngine,
};

/// Consecutive refresh failures tolerated before the fault becomes fatal.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Refresh interval used when the playlist carries no target duration.
const DEFAULT_TARGET_DURATION_SECS: u64 = 6;

/// Delay before retrying a failed refresh.
const RETRY_DELAY_MS: u64 = 2_000;

/// Backoff before each reload requested through `retry_load`.
const RESTART_DELAYS_MS: [u64; 3] = [1_000, 2_000, 4_000];

/// Refresh and reload pacing.
#[derive(Debug, Clone)]
struct ProbeTiming {
    retry_delay: Duration,
    restart_delays: Vec<Duration>,
}

impl Default for ProbeTiming {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            restart_delays: RESTART_DELAYS_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
        }
    }
}

/// What the probe learned from one playlist fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistInfo {
    pub target_duration: Option<u64>,
    /// Variant URIs of a multivariant playlist, in declaration order.
    pub variants: Vec<String>,
    pub segments: usize,
    pub ended: bool,
}

impl PlaylistInfo {
    fn is_multivariant(&self) -> bool {
        !self.variants.is_empty() && self.segments == 0
    }
}

/// Parses the parts of an M3U8 playlist the probe cares about.
pub fn parse_playlist(body: &str) -> Result<PlaylistInfo, String> {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next() != Some(EXTM3U_TAG) {
        return Err("missing #EXTM3U header".to_string());
    }

    let mut info = PlaylistInfo {
        target_duration: None,
        variants: Vec::new(),
        segments: 0,
        ended: false,
    };
    let mut expect_variant = false;
    for line in lines {
        if let Some(value) = line.strip_prefix(TARGET_DURATION_TAG) {
            info.target_duration = value.trim().parse().ok();
        } else if line.starts_with(STREAM_INF_TAG) {
            expect_variant = true;
        } else if line == ENDLIST_TAG {
            info.ended = true;
        } else if !line.starts_with('#') {
            if expect_variant {
                info.variants.push(line.to_string());
                expect_variant = false;
            } else {
                info.segments += 1;
            }
        }
    }

    if info.segments == 0 && info.variants.is_empty() {
        return Err("playlist lists no segments or variants".to_string());
    }
    Ok(info)
}

/// How long to wait before the next refresh.
fn refresh_interval(info: &PlaylistInfo, low_latency: bool) -> Duration {
    let target = info
        .target_duration
        .unwrap_or(DEFAULT_TARGET_DURATION_SECS)
        .max(1);
    if low_latency {
        Duration::from_millis(target * 500)
    } else {
        Duration::from_secs(target)
    }
}

enum ProbeError {
    Network(String),
    Invalid(String),
}

async fn fetch_playlist(client: &Client, url: &Url) -> Result<PlaylistInfo, ProbeError> {
    let res = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ProbeError::Network(e.to_string()))?;
    let status = res.status();
    if !status.is_success() {
        return Err(ProbeError::Network(format!("playlist returned HTTP {}", status)));
    }
    let body = res
        .text()
        .await
        .map_err(|e| ProbeError::Network(e.to_string()))?;
    parse_playlist(&body).map_err(ProbeError::Invalid)
}

struct ProbeTask {
    client: Client,
    url: Url,
    low_latency: bool,
    retry_delay: Duration,
    start_after: Duration,
    /// Reloads used so far; cleared once a fetch succeeds.
    restarts: Arc<AtomicUsize>,
    events: EngineEventSink,
    cancel: CancellationToken,
}

impl ProbeTask {
    async fn run(mut self) {
        if !self.start_after.is_zero() {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.start_after) => {}
            }
        }

        let mut failures = 0u32;
        let mut parsed = false;
        let mut followed_variant = false;

        loop {
            if self.events.is_closed() {
                return;
            }

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => return,
                fetched = fetch_playlist(&self.client, &self.url) => fetched,
            };

            let wait = match fetched {
                Ok(info) if info.is_multivariant() => {
                    match self.url.join(&info.variants[0]) {
                        Ok(variant) if !followed_variant => {
                            followed_variant = true;
                            log::info!("[Probe] Following variant {}", variant);
                            self.url = variant;
                            continue;
                        }
                        Ok(variant) => {
                            self.events.send(EngineEvent::Fault(EngineFault::fatal(
                                FaultKind::Other,
                                format!("nested multivariant playlist at {}", variant),
                            )));
                            return;
                        }
                        Err(e) => {
                            self.events.send(EngineEvent::Fault(EngineFault::fatal(
                                FaultKind::Other,
                                format!("bad variant URI: {}", e),
                            )));
                            return;
                        }
                    }
                }
                Ok(info) => {
                    failures = 0;
                    self.restarts.store(0, Ordering::SeqCst);
                    if !parsed {
                        parsed = true;
                        log::info!(
                            "[Probe] Playlist ok: {} segment(s), target duration {:?}s",
                            info.segments,
                            info.target_duration
                        );
                        self.events.send(EngineEvent::ManifestParsed);
                    }
                    if info.ended {
                        log::info!("[Probe] Playlist ended, stopping refresh");
                        return;
                    }
                    refresh_interval(&info, self.low_latency)
                }
                Err(ProbeError::Invalid(detail)) => {
                    self.events.send(EngineEvent::Fault(EngineFault::fatal(
                        FaultKind::Mux,
                        detail,
                    )));
                    return;
                }
                Err(ProbeError::Network(detail)) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        self.events.send(EngineEvent::Fault(EngineFault::fatal(
                            FaultKind::Network,
                            detail,
                        )));
                        return;
                    }
                    self.events.send(EngineEvent::Fault(EngineFault::transient(
                        FaultKind::Network,
                        detail,
                    )));
                    self.retry_delay
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

/// Streaming engine backed by a playlist probe task.
pub struct ManifestProbeEngine {
    client: Client,
    handle: Handle,
    options: EngineOptions,
    events: EngineEventSink,
    timing: ProbeTiming,
    url: Option<Url>,
    bound: bool,
    restarts: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl ManifestProbeEngine {
    fn new(
        client: Client,
        handle: Handle,
        options: EngineOptions,
        timing: ProbeTiming,
        events: EngineEventSink,
    ) -> Self {
        Self {
            client,
            handle,
            options,
            events,
            timing,
            url: None,
            bound: false,
            restarts: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
        }
    }

    fn restart(&mut self, start_after: Duration) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        let Some(url) = self.url.clone() else {
            return;
        };
        let task = ProbeTask {
            client: self.client.clone(),
            url,
            low_latency: self.options.low_latency,
            retry_delay: self.timing.retry_delay,
            start_after,
            restarts: Arc::clone(&self.restarts),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
        };
        self.handle.spawn(task.run());
    }
}

impl StreamingEngine for ManifestProbeEngine {
    fn load_source(&mut self, url: &str) {
        match Url::parse(url) {
            Ok(parsed) => {
                self.url = Some(parsed);
                self.restarts.store(0, Ordering::SeqCst);
                self.restart(Duration::ZERO);
            }
            Err(e) => {
                self.cancel.cancel();
                self.url = None;
                self.events.send(EngineEvent::Fault(EngineFault::fatal(
                    FaultKind::Other,
                    format!("invalid stream URL {}: {}", url, e),
                )));
            }
        }
    }

    fn attach_device(&mut self, _device: Arc<dyn PlaybackDevice>) {
        self.bound = true;
    }

    fn retry_load(&mut self) {
        let attempt = self.restarts.fetch_add(1, Ordering::SeqCst);
        let Some(&delay) = self.timing.restart_delays.get(attempt) else {
            log::warn!(
                "[Probe] Giving up on session {} after {} reloads",
                self.events.session(),
                attempt
            );
            self.cancel.cancel();
            self.events.send(EngineEvent::Fault(EngineFault::fatal(
                FaultKind::Other,
                format!("playlist unreachable after {} reloads", attempt),
            )));
            return;
        };
        log::info!(
            "[Probe] Reloading playlist for session {} in {:?} (attempt {}/{})",
            self.events.session(),
            delay,
            attempt + 1,
            self.timing.restart_delays.len()
        );
        self.restart(delay);
    }

    fn recover_media_error(&mut self) {
        log::info!("[Probe] Media recovery requested; nothing buffered to rebuild");
    }

    fn destroy(&mut self) {
        self.cancel.cancel();
        if std::mem::take(&mut self.bound) {
            log::debug!("[Probe] Released device for session {}", self.events.session());
        }
    }
}

/// Creates [`ManifestProbeEngine`]s on the given runtime.
pub struct ManifestProbeFactory {
    client: Client,
    handle: Handle,
    timing: ProbeTiming,
}

impl ManifestProbeFactory {
    pub fn new(client: Client, handle: Handle) -> Self {
        Self {
            client,
            handle,
            timing: ProbeTiming::default(),
        }
    }
}

#[cfg(test)]
impl ManifestProbeFactory {
    fn with_timing(client: Client, handle: Handle, timing: ProbeTiming) -> Self {
        Self {
            client,
            handle,
            timing,
        }
    }
}

impl EngineFactory for ManifestProbeFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(
        &self,
        options: &EngineOptions,
        events: EngineEventSink,
    ) -> Box<dyn StreamingEngine> {
        Box::new(ManifestProbeEngine::new(
            self.client.clone(),
            self.handle.clone(),
            options.clone(),
            self.timing.clone(),
            events,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tuner_core::playback::{SessionInbox, SessionMessage};
    use tuner_core::{
        NoopEventEmitter, PlaybackStatus, PlayerConfig, PlayerController, StreamDescriptor,
        TokioSpawner,
    };

    use crate::headless::HeadlessDevice;

    const MEDIA_PLAYLIST: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-TARGETDURATION:4\n\
        #EXT-X-MEDIA-SEQUENCE:120\n\
        #EXTINF:4.0,\n\
        seg120.ts\n\
        #EXTINF:4.0,\n\
        seg121.ts\n";

    const MULTIVARIANT_PLAYLIST: &str = "#EXTM3U\n\
        #EXT-X-STREAM-INF:BANDWIDTH=128000,CODECS=\"mp4a.40.2\"\n\
        audio/128k.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=64000\n\
        audio/64k.m3u8\n";

    #[test]
    fn parses_media_playlist() {
        let info = parse_playlist(MEDIA_PLAYLIST).expect("parse");

        assert_eq!(info.target_duration, Some(4));
        assert_eq!(info.segments, 2);
        assert!(!info.ended);
        assert!(!info.is_multivariant());
    }

    #[test]
    fn parses_multivariant_playlist() {
        let info = parse_playlist(MULTIVARIANT_PLAYLIST).expect("parse");

        assert!(info.is_multivariant());
        assert_eq!(info.variants[0], "audio/128k.m3u8");
    }

    #[test]
    fn rejects_non_playlists() {
        assert!(parse_playlist("<html>502 Bad Gateway</html>").is_err());
        assert!(parse_playlist("#EXTM3U\n#EXT-X-VERSION:3\n").is_err());
    }

    #[test]
    fn low_latency_refreshes_at_half_target() {
        let info = parse_playlist(MEDIA_PLAYLIST).expect("parse");

        assert_eq!(refresh_interval(&info, true), Duration::from_secs(2));
        assert_eq!(refresh_interval(&info, false), Duration::from_secs(4));
    }

    #[test]
    fn detects_end_of_playlist() {
        let body = format!("{}#EXT-X-ENDLIST\n", MEDIA_PLAYLIST);
        assert!(parse_playlist(&body).expect("parse").ended);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Engine against a local playlist server
    // ─────────────────────────────────────────────────────────────────────────

    const LIVE_PLAYLIST: &str = "#EXTM3U\n\
        #EXT-X-TARGETDURATION:1\n\
        #EXTINF:1.0,\n\
        seg1.ts\n";

    /// Serves `status` and `body` to every request and counts requests.
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{}/live.m3u8", addr), hits)
    }

    fn fast_timing(restarts: usize) -> ProbeTiming {
        ProbeTiming {
            retry_delay: Duration::from_millis(5),
            restart_delays: vec![Duration::from_millis(10); restarts],
        }
    }

    fn player(timing: ProbeTiming) -> (PlayerController, SessionInbox) {
        let factory = ManifestProbeFactory::with_timing(Client::new(), Handle::current(), timing);
        PlayerController::new(
            Arc::new(HeadlessDevice::new()),
            Arc::new(factory),
            &PlayerConfig::default(),
            Arc::new(NoopEventEmitter),
            TokioSpawner::current(),
        )
    }

    /// Waits for the next engine message, skipping device messages.
    async fn next_engine_message(
        inbox: &mut SessionInbox,
        wait: Duration,
    ) -> Option<SessionMessage> {
        tokio::time::timeout(wait, async {
            loop {
                match inbox.recv().await? {
                    message @ SessionMessage::Engine { .. } => return Some(message),
                    SessionMessage::Device { .. } => continue,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    fn engine_event(message: SessionMessage) -> EngineEvent {
        match message {
            SessionMessage::Engine { event, .. } => event,
            other => panic!("expected engine message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_fetch_reports_manifest_once() {
        let (url, hits) = serve("200 OK", LIVE_PLAYLIST).await;
        let (controller, mut inbox) = player(fast_timing(3));

        controller.set_stream(Some(StreamDescriptor::new(url)));

        let first = next_engine_message(&mut inbox, Duration::from_secs(5)).await;
        assert_eq!(first.map(engine_event), Some(EngineEvent::ManifestParsed));

        // Refreshes keep running at half the target duration without reporting again.
        let more = next_engine_message(&mut inbox, Duration::from_millis(1_200)).await;
        assert!(more.is_none(), "unexpected {:?}", more);
        assert!(hits.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn three_failed_fetches_escalate_to_fatal_network() {
        let (url, hits) = serve("500 Internal Server Error", "").await;
        let (controller, mut inbox) = player(fast_timing(3));

        controller.set_stream(Some(StreamDescriptor::new(url)));

        let mut faults = Vec::new();
        for _ in 0..3 {
            let message = next_engine_message(&mut inbox, Duration::from_secs(5))
                .await
                .expect("fault");
            match engine_event(message) {
                EngineEvent::Fault(fault) => faults.push((fault.fatal, fault.kind)),
                other => panic!("expected fault, got {:?}", other),
            }
        }
        assert_eq!(
            faults,
            vec![
                (false, FaultKind::Network),
                (false, FaultKind::Network),
                (true, FaultKind::Network),
            ]
        );

        assert!(next_engine_message(&mut inbox, Duration::from_millis(200))
            .await
            .is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn destroy_stops_refreshing() {
        let (url, hits) = serve("200 OK", LIVE_PLAYLIST).await;
        let (controller, mut inbox) = player(fast_timing(3));

        controller.set_stream(Some(StreamDescriptor::new(url)));
        let first = next_engine_message(&mut inbox, Duration::from_secs(5)).await;
        assert_eq!(first.map(engine_event), Some(EngineEvent::ManifestParsed));

        controller.set_stream(None);
        let fetched = hits.load(Ordering::SeqCst);

        assert!(next_engine_message(&mut inbox, Duration::from_millis(1_200))
            .await
            .is_none());
        assert_eq!(hits.load(Ordering::SeqCst), fetched);
    }

    #[tokio::test]
    async fn malformed_url_moves_player_to_error() {
        let (controller, mut inbox) = player(fast_timing(3));

        controller.set_stream(Some(StreamDescriptor::new("not a url")));
        controller.drain(&mut inbox);

        assert_eq!(controller.status(), PlaybackStatus::Error);
        let fault = controller.fault().expect("fault record");
        assert_eq!(fault.code, "fatal_engine");
    }

    #[tokio::test]
    async fn unreachable_stream_gives_up_after_reload_ceiling() {
        let (url, hits) = serve("503 Service Unavailable", "").await;
        let (controller, mut inbox) = player(fast_timing(2));

        controller.set_stream(Some(StreamDescriptor::new(url)));

        let mut fatal_network = 0;
        while controller.status() != PlaybackStatus::Error {
            let message = next_engine_message(&mut inbox, Duration::from_secs(5))
                .await
                .expect("player never reached error");
            if let SessionMessage::Engine {
                event: EngineEvent::Fault(ref fault),
                ..
            } = message
            {
                if fault.fatal && fault.kind == FaultKind::Network {
                    fatal_network += 1;
                }
            }
            controller.dispatch(message);
        }

        // The first load plus two reloads, three fetches each.
        assert_eq!(fatal_network, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 9);
        assert!(next_engine_message(&mut inbox, Duration::from_millis(200))
            .await
            .is_none());
    }
}
