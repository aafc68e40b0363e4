use super::parsing::{
    env_optional, env_or_default, is_supported_image_extension, normalize_api_prefix, parse_bool,
    parse_cors_origins, parse_environment, parse_f32, parse_i32, parse_string_list, parse_u16,
    parse_u32, parse_u64, parse_usize,
};
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, StorageSettings,
    TelemetrySettings, TutoringSettings,
};

const MIN_SESSION_CODE_LENGTH: usize = 4;
const MAX_SESSION_CODE_LENGTH: usize = 12;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("TUTOR_HOST", "0.0.0.0");
        let port = env_or_default("TUTOR_PORT", "8000");

        let environment =
            parse_environment(env_optional("TUTOR_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("TUTOR_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Math Tutor API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = normalize_api_prefix(&env_or_default("API_PREFIX", "/api"));

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "tutor");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "math_tutor");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o");
        let ai_vision_model = env_or_default("AI_VISION_MODEL", &ai_model);
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "1200"))?;
        let ai_temperature =
            parse_f32("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.4"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;

        let session_code_length =
            parse_usize("SESSION_CODE_LENGTH", env_or_default("SESSION_CODE_LENGTH", "6"))?;
        let session_idle_ttl_hours =
            parse_u64("SESSION_IDLE_TTL_HOURS", env_or_default("SESSION_IDLE_TTL_HOURS", "72"))?;
        let stuck_turn_threshold =
            parse_i32("STUCK_TURN_THRESHOLD", env_or_default("STUCK_TURN_THRESHOLD", "3"))?;
        let max_history_turns =
            parse_u32("MAX_HISTORY_TURNS", env_or_default("MAX_HISTORY_TURNS", "20"))?;
        let max_problem_chars =
            parse_usize("MAX_PROBLEM_CHARS", env_or_default("MAX_PROBLEM_CHARS", "4000"))?;
        let max_message_chars =
            parse_usize("MAX_MESSAGE_CHARS", env_or_default("MAX_MESSAGE_CHARS", "2000"))?;
        let max_similar_problems =
            parse_u32("MAX_SIMILAR_PROBLEMS", env_or_default("MAX_SIMILAR_PROBLEMS", "5"))?;
        let chat_rate_limit_per_minute = parse_u64(
            "CHAT_RATE_LIMIT_PER_MINUTE",
            env_or_default("CHAT_RATE_LIMIT_PER_MINUTE", "30"),
        )?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_image_extensions =
            parse_string_list(env_optional("ALLOWED_IMAGE_EXTENSIONS"), &["jpg", "jpeg", "png"]);

        let log_level = env_or_default("TUTOR_LOG_LEVEL", "info");
        let json = env_optional("TUTOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_vision_model,
                ai_max_tokens,
                ai_temperature,
                ai_request_timeout,
            },
            tutoring: TutoringSettings {
                session_code_length,
                session_idle_ttl_hours,
                stuck_turn_threshold,
                max_history_turns: i64::from(max_history_turns),
                max_problem_chars,
                max_message_chars,
                max_similar_problems,
                chat_rate_limit_per_minute,
            },
            storage: StorageSettings { max_upload_size_mb, allowed_image_extensions },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn tutoring(&self) -> &TutoringSettings {
        &self.tutoring
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_image_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_IMAGE_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_image_extensions {
            if !is_supported_image_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_IMAGE_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        let code_length = self.tutoring.session_code_length;
        if !(MIN_SESSION_CODE_LENGTH..=MAX_SESSION_CODE_LENGTH).contains(&code_length) {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_CODE_LENGTH",
                value: code_length.to_string(),
            });
        }

        if self.tutoring.session_idle_ttl_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_IDLE_TTL_HOURS",
                value: "0".to_string(),
            });
        }

        if self.tutoring.stuck_turn_threshold <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "STUCK_TURN_THRESHOLD",
                value: self.tutoring.stuck_turn_threshold.to_string(),
            });
        }

        if self.tutoring.max_similar_problems == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_SIMILAR_PROBLEMS",
                value: "0".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.ai.ai_temperature) {
            return Err(ConfigError::InvalidValue {
                field: "AI_TEMPERATURE",
                value: self.ai.ai_temperature.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }

        Ok(())
    }
}
