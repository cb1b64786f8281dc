//! Application constants for the ADE rooms engine
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain. The GWT-RPC request bodies are recorded
//! fixtures specific to the deployed platform version; they must be carried
//! verbatim, never regenerated.

use std::time::Duration;

/// Remote platform endpoints and protocol headers
pub mod ade {
    /// Landing page that mints the `JSESSIONID` cookie
    pub const SESSION_PAGE_URL: &str = "https://planif.esiee.fr/";

    /// GWT module base, also sent as the `X-GWT-Module-Base` header
    pub const MODULE_BASE_URL: &str = "https://planif.esiee.fr/direct/gwtdirectplanning/";

    /// `X-GWT-Permutation` value of the deployed web client
    pub const GWT_PERMUTATION: &str = "84978C43E1DD9746A3991E03E83BCE38";

    /// Content type for every GWT-RPC call
    pub const GWT_CONTENT_TYPE: &str = "text/x-gwt-rpc; charset=utf-8";

    /// RPC service endpoint names, relative to [`MODULE_BASE_URL`]
    pub const CONFIGURATION_SERVICE: &str = "ConfigurationServiceProxy";
    pub const WEB_CLIENT_SERVICE: &str = "WebClientServiceProxy";
    pub const DIRECT_PLANNING_SERVICE: &str = "DirectPlanningServiceProxy";
    pub const PLANNING_SERVICE: &str = "DirectPlanningPlanningServiceProxy";

    /// Cookie attributes appended by the server that the web client strips
    /// before replaying the cookie on RPC calls
    pub const COOKIE_STRIP_SUFFIX: &str = " Path=/direct; Secure";

    /// Session tokens embedded in the recorded request bodies
    pub const SESSION_TOKEN_CONFIG: &str = "ZQrtw$m";
    pub const SESSION_TOKEN: &str = "ZQrwXtk";

    /// Mirrored pre-computed room-status endpoint, tried before scraping
    pub const MIRROR_URL: &str = "https://olivier-truong-ade-free-rooms.hf.space/api";
}

/// Recorded GWT-RPC request bodies (protocol fixtures)
pub mod fixtures {
    /// `method1getInitialConfiguration`: first RPC after the cookie mint
    pub const INITIAL_CONFIGURATION_BODY: &str = "7|0|7|https://planif.esiee.fr/direct/gwtdirectplanning/|65782F4BD6A979FD5D493428851A7CD3|com.adesoft.gwt.core.client.rpc.ConfigurationServiceProxy|method1getInitialConfiguration|J|java.lang.String/2004016611|fr|1|2|3|4|2|5|6|ZQrtw$m|7|";

    /// `method1login`: anonymous reader login (`lecteur1`)
    pub const LOGIN_BODY: &str = "7|0|9|https://planif.esiee.fr/direct/gwtdirectplanning/|1DB505FD9B7EA449BBDD73013628438C|com.adesoft.gwt.core.client.rpc.WebClientServiceProxy|method1login|J|com.adesoft.gwt.core.client.rpc.data.LoginRequest/3705388826|com.adesoft.gwt.directplan.client.rpc.data.DirectLoginRequest/635437471|lecteur1||1|2|3|4|2|5|6|ZQrwXtk|7|0|0|0|0|0|8|9|-1|0|0|";

    /// `method4getProjectList`: enumerates the academic-year projects
    pub const PROJECT_LIST_BODY: &str = "7|0|5|https://planif.esiee.fr/direct/gwtdirectplanning/|1DB505FD9B7EA449BBDD73013628438C|com.adesoft.gwt.core.client.rpc.WebClientServiceProxy|method4getProjectList|J|1|2|3|4|1|5|ZQrwXtk|";

    /// `method13loadProject`: selects the academic period for the session;
    /// the fetcher appends `{period}|1|`
    pub const LOAD_PROJECT_PREFIX: &str = "7|0|7|https://planif.esiee.fr/direct/gwtdirectplanning/|BB468225DBC62C7786D92BE512B62089|com.adesoft.gwt.directplan.client.rpc.DirectPlanningServiceProxy|method13loadProject|J|I|Z|1|2|3|4|3|5|6|7|ZQrwXtk|";

    /// `method4getChildren`: shared header of every catalog request
    pub const GET_CHILDREN_HEADER: &str = "7|0|20|https://planif.esiee.fr/direct/gwtdirectplanning/|BB468225DBC62C7786D92BE512B62089|com.adesoft.gwt.directplan.client.rpc.DirectPlanningServiceProxy|method4getChildren|J|java.lang.String/2004016611|com.adesoft.gwt.directplan.client.ui.tree.TreeResourceConfig/2234901663|";

    /// `method4getChildren`: shared tail (field table + payload indices)
    pub const GET_CHILDREN_TAIL: &str = "|[I/2970817851|java.util.LinkedHashMap/3008245022|COLOR|com.adesoft.gwt.core.client.rpc.config.OutputField/870745015|LabelColor||com.adesoft.gwt.core.client.rpc.config.FieldType/3992110146|NAME|LabelName|java.util.ArrayList/4159755760|com.extjs.gxt.ui.client.data.SortInfo/1143517771|com.extjs.gxt.ui.client.Style$SortDir/640452531|1|2|3|4|3|5|6|7|ZQrwXtk|8|7|0|9|2|-1|-1|10|0|2|6|11|12|0|13|11|14|15|11|0|0|6|16|12|0|17|16|14|15|4|0|0|18|0|18|0|19|20|1|16|18|0|";

    /// `method5getLegends`: the per-room "select" call; the fetcher appends
    /// `{room}|8|1|9|{week}|7|11|1|{period}|`
    pub const SELECT_HEADER: &str = "7|0|12|https://planif.esiee.fr/direct/gwtdirectplanning/|A0AD6035033F296E20376B66C2082700|com.adesoft.gwt.directplan.client.rpc.DirectPlanningPlanningServiceProxy|method5getLegends|J|com.adesoft.gwt.core.client.rpc.data.planning.PlanningSelection/886937684|com.extjs.gxt.ui.client.data.SortInfo/1143517771|java.util.ArrayList/4159755760|java.lang.Integer/3438268394|Cumul|com.extjs.gxt.ui.client.Style$SortDir/640452531|NAME|1|2|3|4|3|5|6|7|ZQrwXtk|6|8|7|9|0|9|1|9|2|9|3|9|4|9|5|9|6|25|10|0|8|1|9|";

    /// `method8getTimetable`: the per-room grid fetch; the fetcher appends
    /// `{period}|0|10|1|11|{room}|10|1|11|{week}|1235|185|1|10|0|`
    pub const TIMETABLE_HEADER: &str = "7|0|12|https://planif.esiee.fr/direct/gwtdirectplanning/|A0AD6035033F296E20376B66C2082700|com.adesoft.gwt.directplan.client.rpc.DirectPlanningPlanningServiceProxy|method8getTimetable|J|com.adesoft.gwt.core.client.rpc.data.planning.PlanningSelection/886937684|I|Z|java.util.List|java.util.ArrayList/4159755760|java.lang.Integer/3438268394|Cumul|1|2|3|4|6|5|6|7|7|8|9|ZQrwXtk|6|10|7|11|0|11|1|11|2|11|3|11|4|11|5|11|6|25|";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// The recorded browser user agent; the platform keys the served GWT
    /// permutation on it, so it is part of the protocol fixture set
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for remote calls (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// Maximum retry attempts for transient failures
    pub const MAX_RETRIES: u32 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// Grid decoding constants, reverse-engineered from the deployed client
pub mod grid {
    /// Marker that opens the integer grid inside the RPC envelope
    pub const ENVELOPE_MARKER: &str = "//OK[";

    /// Terminator of the integer grid (start of the string table)
    pub const ENVELOPE_END: &str = ",[";

    /// Inclusive marker band signalling a slot transition
    pub const MARKER_BAND_MIN: i64 = 174;
    pub const MARKER_BAND_MAX: i64 = 178;

    /// A boundary event requires the value after the marker to drop below this
    pub const DROP_THRESHOLD: i64 = 140;

    /// Grid slots per day; also divides the day code into a weekday index
    pub const SLOTS_PER_DAY: i64 = 176;

    /// Grid slots per hour
    pub const SLOTS_PER_HOUR: f64 = 12.75;

    /// Wall-clock hour of the first grid slot (07:30)
    pub const DAY_START_HOURS: f64 = 7.5;

    /// Empirical nudge applied to interval starts only
    pub const START_NUDGE_HOURS: f64 = 0.02;
}

/// Calendar mapping between dates and the platform's numbering
pub mod calendar {
    /// Anchor Monday that the platform counts weeks and weekdays from
    pub const ANCHOR_YEAR: i32 = 2024;
    pub const ANCHOR_MONTH: u32 = 12;
    pub const ANCHOR_DAY: u32 = 30;

    /// Offset added to the 52-week cycle position
    pub const WEEK_OFFSET: i64 = 19;

    /// Correction subtracted when the offset week reaches a full cycle
    pub const WEEK_WRAP: i64 = 59;

    /// Period index of the 2024-2025 academic year
    pub const PERIOD_BASE: i64 = 12;

    /// Month in which the academic year (and the period index) rolls over
    pub const PERIOD_ROLLOVER_MONTH: u32 = 9;
}

/// Worker and concurrency configuration
pub mod workers {
    /// Default number of concurrent in-flight room fetches per pass
    pub const DEFAULT_WORKER_COUNT: usize = 6;

    /// Upper bound enforced on configured worker counts
    pub const MAX_WORKER_COUNT: usize = 8;
}

/// Cache and persistence configuration
pub mod cache {
    use super::Duration;

    /// Default snapshot time-to-live
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    /// Snapshot state file name under the platform cache directory
    pub const STATE_FILE_NAME: &str = "snapshot.json";

    /// Application directory name under the platform cache directory
    pub const APP_DIR_NAME: &str = "ade-rooms";

    /// Temporary file suffix for atomic snapshot writes
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

// Re-export commonly used constants for convenience
pub use ade::{MIRROR_URL, MODULE_BASE_URL, SESSION_PAGE_URL};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
pub use workers::DEFAULT_WORKER_COUNT;
