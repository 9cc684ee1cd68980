use std::env;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_images";
const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Http,
    Stdio,
}

/// Process configuration, read once at startup and handed to the server.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub output_dir: PathBuf,
    /// Root for local source images and masks. Unset means only http(s)
    /// references are accepted.
    pub input_dir: Option<PathBuf>,
    pub transport: Transport,
    pub port: u16,
    pub secret_key: Option<String>,
    pub images_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env_value("MCP_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let bind_address = format!("0.0.0.0:{port}");
        let transport = match env_value("MCP_TRANSPORT").as_deref() {
            Some(value) if value.eq_ignore_ascii_case("stdio") => Transport::Stdio,
            _ => Transport::Http,
        };
        Self {
            api_key: env_value("OPENAI_API_KEY"),
            base_url: env_value("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            output_dir: env_value("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            input_dir: env_value("INPUT_DIR").map(PathBuf::from),
            transport,
            port,
            secret_key: env_value("SECRET_KEY"),
            images_base_url: resolve_images_base_url(
                env_value("IMAGES_URL").as_deref(),
                env_value("DOMAIN").as_deref(),
                &bind_address,
            ),
        }
    }

    /// Configuration for embedding the operations without the server, e.g. in tests.
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, output_dir: PathBuf) -> Self {
        Self {
            api_key: api_key.filter(|value| !value.trim().is_empty()),
            base_url: base_url.into(),
            output_dir,
            input_dir: None,
            transport: Transport::Http,
            port: DEFAULT_PORT,
            secret_key: None,
            images_base_url: format!("http://127.0.0.1:{DEFAULT_PORT}/images"),
        }
    }

    pub fn with_input_dir(mut self, input_dir: impl Into<PathBuf>) -> Self {
        self.input_dir = Some(input_dir.into());
        self
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn mcp_path(&self) -> String {
        match self.secret_key.as_deref() {
            Some(value) => format!("/{value}/mcp"),
            None => "/mcp".to_string(),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_images_base_url(images_url: Option<&str>, domain: Option<&str>, bind_address: &str) -> String {
    if let Some(images_url) = images_url {
        return format!("{}/images", images_url.trim_end_matches('/'));
    }
    let raw = domain.unwrap_or(bind_address).trim_end_matches('/');
    let base = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    format!("{}/images", strip_doubled_scheme(&base))
}

pub(crate) fn strip_doubled_scheme(raw: &str) -> String {
    let mut base = raw.to_string();
    loop {
        let next = if let Some(rest) = base.strip_prefix("http://http://") {
            format!("http://{rest}")
        } else if let Some(rest) = base.strip_prefix("https://https://") {
            format!("https://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://https://") {
            format!("https://{rest}")
        } else if let Some(rest) = base.strip_prefix("https://http://") {
            format!("http://{rest}")
        } else {
            return base;
        };
        base = next;
    }
}
