//! Named personalities and the active-persona slot.
//!
//! The set is fixed at compile time. Exactly one persona is active at a
//! time; an optional one-shot timer reverts to the default. Nothing here
//! is persisted, every restart comes up as `normal`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::completion::GenerationParams;

pub const DEFAULT_PERSONA: &str = "normal";

/// Revert timer bounds, in minutes.
pub const MIN_REVERT_MINUTES: u64 = 1;
pub const MAX_REVERT_MINUTES: u64 = 60;

#[derive(Debug)]
pub struct Persona {
    pub name: &'static str,
    pub instruction: &'static str,
    pub params: GenerationParams,
}

const BASE_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.7,
    top_p: 0.95,
    presence_penalty: 0.6,
    frequency_penalty: 0.3,
};

static PERSONAS: &[Persona] = &[
    Persona {
        name: "normal",
        instruction: "Sen bir grup sohbetinde takılan, samimi ve esprili bir botsun. \
            Kısa cevap verirsin, en fazla iki üç cümle. Doğal konuşursun, resmi dil kullanmazsın. \
            Bağlamdaki önceki mesajları okur, sohbete uygun cevap verirsin.",
        params: BASE_PARAMS,
    },
    Persona {
        name: "korsan",
        instruction: "Sen eski bir korsan gibi konuşan bir botsun. Her cevabında denizci \
            ağzı kullanırsın: \"vay canına\", \"çapa at\", \"yelken aç\" gibi laflar edersin. \
            Kısa konuşursun, en fazla iki üç cümle. Karaya ayak basmış huysuz bir kaptan gibisin.",
        params: BASE_PARAMS,
    },
    Persona {
        name: "sinirli",
        instruction: "Sen ters, alaycı ve sabırsız bir botsun. Kimseye yaranmaya çalışmazsın, \
            iğneleyici cevaplar verirsin ve salakça sorularla dalga geçersin. Kibar kelimeler \
            kullanmazsın, laf sokmadan cevap vermezsin. Cevapların kısa olsun, en fazla iki üç \
            cümle. Bağlamdaki önceki mesajları okur, ona göre kinaye yaparsın.",
        // Hotter sampling so the snark doesn't repeat itself
        params: GenerationParams {
            temperature: 0.9,
            top_p: 0.95,
            presence_penalty: 0.6,
            frequency_penalty: 0.7,
        },
    },
    Persona {
        name: "terapist",
        instruction: "Sen sakin ve anlayışlı bir terapist gibi konuşan bir botsun. \
            Yargılamazsın, dinlersin, nazikçe soru sorarsın. Kısa ve yumuşak cevaplar verirsin, \
            en fazla iki üç cümle.",
        params: BASE_PARAMS,
    },
];

pub fn find(name: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.name == name)
}

/// Comma-separated list of valid names, for usage messages.
pub fn names() -> String {
    PERSONAS.iter().map(|p| p.name).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, PartialEq)]
pub enum PersonaError {
    Unknown(String),
    DurationOutOfRange(u64),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => {
                write!(f, "'{}' diye bir kişilik yok. Seçenekler: {}", name, names())
            }
            Self::DurationOutOfRange(minutes) => write!(
                f,
                "{} dakika olmaz, {}-{} arası bir süre ver.",
                minutes, MIN_REVERT_MINUTES, MAX_REVERT_MINUTES
            ),
        }
    }
}

struct Inner {
    active: &'static Persona,
    /// Pending revert task. At most one outstanding; replaced on every
    /// switch (abort before reschedule).
    revert: Option<JoinHandle<()>>,
}

/// The process-wide active persona, owned by the session object rather
/// than a global.
pub struct PersonaStore {
    inner: Arc<Mutex<Inner>>,
}

impl PersonaStore {
    pub fn new() -> Self {
        let active = find(DEFAULT_PERSONA).expect("default persona must exist");
        Self {
            inner: Arc::new(Mutex::new(Inner { active, revert: None })),
        }
    }

    /// Snapshot of the currently active persona.
    pub async fn active(&self) -> &'static Persona {
        self.inner.lock().await.active
    }

    /// Switch persona; with `minutes` set, schedule a one-shot revert to
    /// the default. Validates before touching any state.
    pub async fn set(
        &self,
        name: &str,
        minutes: Option<u64>,
    ) -> Result<&'static Persona, PersonaError> {
        if let Some(m) = minutes
            && !(MIN_REVERT_MINUTES..=MAX_REVERT_MINUTES).contains(&m)
        {
            return Err(PersonaError::DurationOutOfRange(m));
        }
        let revert_after = minutes.map(|m| Duration::from_secs(m * 60));
        self.set_for(name, revert_after).await
    }

    /// Like `set`, with the revert delay given directly. Split out so
    /// tests can use millisecond timers.
    pub async fn set_for(
        &self,
        name: &str,
        revert_after: Option<Duration>,
    ) -> Result<&'static Persona, PersonaError> {
        let persona = find(name).ok_or_else(|| PersonaError::Unknown(name.to_string()))?;

        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.revert.take() {
            handle.abort();
        }
        inner.active = persona;

        if let Some(delay) = revert_after {
            let store = self.inner.clone();
            inner.revert = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut inner = store.lock().await;
                inner.active = find(DEFAULT_PERSONA).expect("default persona must exist");
                inner.revert = None;
                info!("Persona reverted to {}", DEFAULT_PERSONA);
            }));
        }

        Ok(persona)
    }
}

impl Default for PersonaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_set_of_personas() {
        assert!(find("normal").is_some());
        assert!(find("korsan").is_some());
        assert!(find("sinirli").is_some());
        assert!(find("terapist").is_some());
        assert!(find("yok-boyle-biri").is_none());
    }

    #[test]
    fn test_only_sinirli_runs_hotter() {
        let sinirli = find("sinirli").unwrap();
        assert!(sinirli.params.temperature > BASE_PARAMS.temperature);
        assert!(sinirli.params.frequency_penalty > BASE_PARAMS.frequency_penalty);

        for name in ["normal", "korsan", "terapist"] {
            assert_eq!(find(name).unwrap().params, BASE_PARAMS);
        }
    }

    #[tokio::test]
    async fn test_starts_as_default() {
        let store = PersonaStore::new();
        assert_eq!(store.active().await.name, DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn test_set_switches_active() {
        let store = PersonaStore::new();
        store.set("korsan", None).await.unwrap();
        assert_eq!(store.active().await.name, "korsan");
    }

    #[tokio::test]
    async fn test_unknown_name_rejected() {
        let store = PersonaStore::new();
        let err = store.set("pirat", None).await.unwrap_err();
        assert_eq!(err, PersonaError::Unknown("pirat".to_string()));
        assert_eq!(store.active().await.name, DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn test_minutes_out_of_range_rejected() {
        let store = PersonaStore::new();
        assert_eq!(
            store.set("korsan", Some(0)).await.unwrap_err(),
            PersonaError::DurationOutOfRange(0)
        );
        assert_eq!(
            store.set("korsan", Some(61)).await.unwrap_err(),
            PersonaError::DurationOutOfRange(61)
        );
        assert_eq!(store.active().await.name, DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn test_timed_switch_reverts_to_default() {
        let store = PersonaStore::new();
        store.set_for("korsan", Some(Duration::from_millis(50))).await.unwrap();
        assert_eq!(store.active().await.name, "korsan");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.active().await.name, DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn test_new_switch_cancels_pending_revert() {
        let store = PersonaStore::new();
        store.set_for("korsan", Some(Duration::from_millis(50))).await.unwrap();
        // Replace before the timer fires; the old revert must not land
        store.set_for("terapist", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.active().await.name, "terapist");
    }
}
