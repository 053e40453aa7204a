// src/services/dashboard_monitor.rs

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, Weak,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::MissedTickBehavior,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::i18n::Locale,
    models::dashboard::{DashboardFilter, DashboardState, DashboardStats},
    services::dashboard_service::DashboardService,
};

/// Mantém o estado ao vivo de uma visão do dashboard.
///
/// Cada ciclo recebe uma geração; uma resposta só é publicada se a sua geração
/// ainda for a mais recente, então resultados atrasados de um filtro antigo
/// nunca sobrescrevem os do filtro atual.
pub struct DashboardMonitor {
    service: DashboardService,
    filter: Mutex<DashboardFilter>,
    generation: AtomicU64,
    state: watch::Sender<DashboardState>,
    // Idioma das mensagens de erro publicadas
    locale: Locale,
}

/// Timer de atualização periódica. Parar o timer = soltar o valor.
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl DashboardMonitor {
    pub fn new(service: DashboardService, filter: DashboardFilter, locale: Locale) -> Arc<Self> {
        let (state, _) = watch::channel(DashboardState::Idle);
        Arc::new(Self {
            service,
            filter: Mutex::new(filter),
            generation: AtomicU64::new(0),
            state,
            locale,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    #[cfg(test)]
    pub fn current(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// O ciclo mais recente ainda não publicou resultado.
    pub fn in_flight(&self) -> bool {
        matches!(*self.state.borrow(), DashboardState::Loading { .. })
    }

    /// Troca o filtro e dispara um novo ciclo imediatamente.
    pub fn set_filter(self: &Arc<Self>, filter: DashboardFilter) -> JoinHandle<()> {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = filter;
        self.refresh()
    }

    /// Inicia um ciclo: Loading agora, Ready/Failed quando os dados chegarem.
    pub fn refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let (generation, filter) = {
            let filter = self.filter.lock().unwrap_or_else(PoisonError::into_inner);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.send_modify(|state| {
                let stale = state.last_good();
                *state = DashboardState::Loading { generation, stale };
            });
            (generation, *filter)
        };

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = monitor.service.compute_stats(&filter).await;
            monitor.publish(generation, outcome);
        })
    }

    fn publish(&self, generation: u64, outcome: Result<DashboardStats, AppError>) {
        let published = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = match outcome {
                Ok(stats) => DashboardState::Ready {
                    generation,
                    stats: Box::new(stats),
                },
                Err(e) => DashboardState::Failed {
                    generation,
                    error: e.localized_message(&self.locale),
                    stale: state.last_good(),
                },
            };
            true
        });

        if !published {
            tracing::debug!(generation, "Resposta de um ciclo antigo descartada");
        }
    }

    /// Atualiza agora e depois a cada `every`, até o timer ser solto.
    /// Um tick que encontra o ciclo anterior ainda em andamento é pulado.
    pub fn start(self: &Arc<Self>, every: Duration) -> RefreshTimer {
        let every = if every.is_zero() { Duration::from_secs(1) } else { every };
        let monitor = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if monitor.in_flight() {
                    tracing::debug!(
                        generation = monitor.generation(),
                        "Ciclo ainda em andamento, tick ignorado"
                    );
                    continue;
                }
                monitor.refresh();
            }
        });

        RefreshTimer { handle }
    }
}

struct LiveSession {
    owner: Uuid,
    monitor: Weak<DashboardMonitor>,
}

/// Streams ao vivo abertos, por id de sessão. Permite trocar o filtro de uma
/// conexão SSE sem reabri-la.
#[derive(Clone, Default)]
pub struct LiveSessions {
    inner: Arc<Mutex<HashMap<Uuid, LiveSession>>>,
}

/// Registro de uma sessão; soltar o valor remove a sessão.
pub struct LiveSessionGuard {
    id: Uuid,
    sessions: LiveSessions,
}

impl LiveSessionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for LiveSessionGuard {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.id);
    }
}

impl LiveSessions {
    pub fn register(&self, owner: Uuid, monitor: &Arc<DashboardMonitor>) -> LiveSessionGuard {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            LiveSession {
                owner,
                monitor: Arc::downgrade(monitor),
            },
        );
        LiveSessionGuard {
            id,
            sessions: self.clone(),
        }
    }

    /// Troca o filtro da sessão `id`. Sessões de outro usuário contam como inexistentes.
    pub fn change_filter(
        &self,
        id: Uuid,
        owner: Uuid,
        filter: DashboardFilter,
    ) -> Result<(), AppError> {
        let monitor = self
            .lock()
            .get(&id)
            .filter(|session| session.owner == owner)
            .and_then(|session| session.monitor.upgrade())
            .ok_or(AppError::LiveSessionNotFound)?;

        tracing::debug!(session = %id, group = %filter.group, "Filtro da sessão ao vivo alterado");
        monitor.set_filter(filter);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, LiveSession>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
