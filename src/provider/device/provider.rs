use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value as Json};
use tracing::{debug, warn};

use super::DeviceTransport;
use crate::config::RepositoryConfig;
use crate::gate::{GateError, PortLockManager};
use crate::provider::{DataProvider, ProviderError, WriteStatus};
use crate::query::{DataQuery, QueryToken, SelectOptions};
use crate::record::{Data, DataList};

const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);
const DEFAULT_LOCK_POLL: Duration = Duration::from_millis(50);
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// Provider that forwards reads and writes to a device on a named port.
///
/// After any transport failure the transport is disconnected and the port
/// cools down; calls made during the cooldown fail with
/// [`ProviderError::CoolingDown`] without touching the device.
pub struct DeviceProvider<T: DeviceTransport> {
    name: String,
    port: String,
    transport: Mutex<T>,
    gates: Arc<PortLockManager>,
    lock_wait: Duration,
    lock_poll: Duration,
    cooldown: Duration,
    reply_timeout: Duration,
    cooling_until: Mutex<Option<Instant>>,
}

impl<T: DeviceTransport> DeviceProvider<T> {
    pub fn new(name: impl Into<String>, port: impl Into<String>, transport: T) -> Self {
        Self {
            name: name.into(),
            port: port.into(),
            transport: Mutex::new(transport),
            gates: Arc::new(PortLockManager::new()),
            lock_wait: DEFAULT_LOCK_WAIT,
            lock_poll: DEFAULT_LOCK_POLL,
            cooldown: DEFAULT_COOLDOWN,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            cooling_until: Mutex::new(None),
        }
    }

    /// Share port gates with other providers on the same ports.
    pub fn with_gates(mut self, gates: Arc<PortLockManager>) -> Self {
        self.gates = gates;
        self
    }

    pub fn with_lock_wait(mut self, wait: Duration, poll: Duration) -> Self {
        self.lock_wait = wait;
        self.lock_poll = poll;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Take lock and cooldown timings from configuration.
    pub fn with_config(self, config: &RepositoryConfig) -> Self {
        self.with_lock_wait(config.lock_wait(), config.lock_poll())
            .with_cooldown(config.device_cooldown())
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooling_until
            .lock()
            .map(|until| until.map(|at| Instant::now() < at).unwrap_or(false))
            .unwrap_or(false)
    }

    fn check_cooldown(&self) -> Result<(), ProviderError> {
        let mut until = self
            .cooling_until
            .lock()
            .map_err(|_| ProviderError::LockPoisoned("device cooldown"))?;
        match *until {
            Some(at) if Instant::now() < at => Err(ProviderError::CoolingDown {
                port: self.port.clone(),
            }),
            Some(_) => {
                *until = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn start_cooldown(&self) {
        if let Ok(mut until) = self.cooling_until.lock() {
            *until = Some(Instant::now() + self.cooldown);
        }
        warn!(provider = %self.name, port = %self.port, cooldown = ?self.cooldown, "device cooling down");
    }

    /// One gated request/reply round trip.
    fn call(&self, request: Json) -> Result<Json, ProviderError> {
        self.check_cooldown()?;
        let gate = self.gates.get_lock(&self.port).map_err(|err| self.gate_error(err))?;
        let _guard = gate
            .acquire_within(self.lock_wait, self.lock_poll)
            .map_err(|err| self.gate_error(err))?;

        let mut transport = self
            .transport
            .lock()
            .map_err(|_| ProviderError::LockPoisoned("device transport"))?;
        let reply = match exchange_json(&mut *transport, &request, self.reply_timeout) {
            Ok(reply) => reply,
            Err(err) => {
                transport.disconnect();
                drop(transport);
                warn!(provider = %self.name, port = %self.port, error = %err, "device exchange failed");
                self.start_cooldown();
                return Err(err);
            }
        };
        if let Some(message) = reply.get("error").and_then(Json::as_str) {
            return Err(ProviderError::Device {
                port: self.port.clone(),
                message: message.to_string(),
            });
        }
        Ok(reply)
    }

    fn gate_error(&self, err: GateError) -> ProviderError {
        match err {
            GateError::Busy(waited) => ProviderError::Busy {
                port: self.port.clone(),
                waited,
            },
            GateError::Poisoned(_) => ProviderError::LockPoisoned("port gate"),
        }
    }

    /// Send one write per record. Returns the affected count.
    fn write_one(&self, op: &str, data: &Data, changed_only: bool) -> Result<u64, ProviderError> {
        let model = data.model();
        let values: serde_json::Map<String, Json> = data
            .values()
            .filter(|(name, _)| model.is_stored(name))
            .filter(|(name, _)| !changed_only || data.is_field_changed(name))
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        let key: serde_json::Map<String, Json> = model
            .key_field_names()
            .iter()
            .map(|name| {
                let value = data.committed_value(name).map(|v| v.to_json()).unwrap_or(Json::Null);
                (name.clone(), value)
            })
            .collect();
        let request = json!({
            "op": op,
            "type": model.type_name(),
            "storage": model.storage_name(),
            "key": key,
            "values": values,
        });
        let reply = self.call(request)?;
        Ok(reply.get("affected").and_then(Json::as_u64).unwrap_or(1))
    }

    fn fail(&self, data: &Data, op: &str, err: &ProviderError) -> WriteStatus {
        warn!(provider = %self.name, model = %data.model().type_name(), op, error = %err, "device write failed");
        WriteStatus::EXCEPTION
    }
}

fn exchange_json<T: DeviceTransport + ?Sized>(
    transport: &mut T,
    request: &Json,
    timeout: Duration,
) -> Result<Json, ProviderError> {
    if !transport.is_connected() {
        transport.connect()?;
    }
    let reply = transport.exchange(&request.to_string(), timeout)?;
    Ok(serde_json::from_str(&reply)?)
}

fn query_json(query: &DataQuery) -> Json {
    let tokens: Vec<Json> = query
        .tokens()
        .into_iter()
        .map(|token| match token {
            QueryToken::Open => json!("("),
            QueryToken::Close => json!(")"),
            QueryToken::Condition(condition) => json!(condition.as_str()),
            QueryToken::Filter(filter) => json!({
                "name": filter.name(),
                "op": filter.operator().as_str(),
                "value": filter.value().to_json(),
            }),
        })
        .collect();
    Json::Array(tokens)
}

impl<T: DeviceTransport> DataProvider for DeviceProvider<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(
        &self,
        data: &Data,
        query: &DataQuery,
        options: &SelectOptions,
    ) -> Result<DataList, ProviderError> {
        let model = data.model();
        let sort: Vec<String> = options
            .sort
            .fields()
            .iter()
            .map(|field| {
                if field.descending {
                    format!("{} desc", field.name)
                } else {
                    field.name.clone()
                }
            })
            .collect();
        let request = json!({
            "op": "select",
            "type": model.type_name(),
            "storage": model.storage_name(),
            "storage_key": data.storage_key(),
            "query": query_json(query),
            "sort": sort.join(", "),
            "page": { "index": options.page.index, "size": options.page.size },
            "fields": options.fields,
        });
        let reply = self.call(request)?;
        let mut list = model.map_untyped(&reply);
        if list.total_count() == 0 {
            list.set_total_count(list.len());
        }
        debug!(provider = %self.name, port = %self.port, rows = list.len(), "device select");
        Ok(list)
    }

    fn select_count(&self, data: &Data, query: &DataQuery) -> Result<usize, ProviderError> {
        let model = data.model();
        let request = json!({
            "op": "count",
            "type": model.type_name(),
            "storage": model.storage_name(),
            "storage_key": data.storage_key(),
            "query": query_json(query),
        });
        let reply = self.call(request)?;
        let count = reply
            .as_u64()
            .or_else(|| reply.get("count").and_then(Json::as_u64))
            .ok_or_else(|| ProviderError::Codec(format!("count reply without a count: {}", reply)))?;
        Ok(count as usize)
    }

    fn insert(&self, list: &mut DataList) -> WriteStatus {
        let mut status = WriteStatus::SUCCESS;
        for data in list.iter_mut() {
            if let Err(err) = self.write_one("insert", data, false) {
                status |= self.fail(data, "insert", &err);
                break;
            }
            data.clear_changed();
        }
        status
    }

    fn update(&self, list: &mut DataList) -> WriteStatus {
        let mut status = WriteStatus::SUCCESS;
        for data in list.iter_mut() {
            if !data.is_changed() {
                status |= WriteStatus::EMPTY;
                continue;
            }
            match self.write_one("update", data, true) {
                Ok(0) => status |= WriteStatus::NOT_FOUND,
                Ok(_) => data.clear_changed(),
                Err(err) => status |= self.fail(data, "update", &err),
            }
        }
        status
    }

    fn delete(&self, list: &mut DataList) -> WriteStatus {
        let mut status = WriteStatus::SUCCESS;
        for data in list.iter_mut() {
            match self.write_one("delete", data, true) {
                Ok(0) => status |= WriteStatus::NOT_FOUND,
                Ok(_) => data.clear_changed(),
                Err(err) => status |= self.fail(data, "delete", &err),
            }
        }
        status
    }
}
