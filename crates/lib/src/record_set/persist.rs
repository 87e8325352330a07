//! Record set persistence: fetching the members and creating new ones.

use std::rc::Rc;

use super::{AddOptions, Input, RecordSet, ResetOptions, SetEvent, SetFetchOptions};
use crate::{
    Record, Result, SaveOptions,
    events::Observable,
    sync::{Handlers, SyncError, SyncOptions, SyncTarget, Transport, Verb, pick_transport},
    value::{Attributes, attributes_from_json},
};

impl RecordSet {
    /// URL of the set's remote resource.
    pub fn url(&self) -> Result<String> {
        self.config().url().map(str::to_string).ok_or_else(|| {
            SyncError::MissingUrl {
                target: format!("set {}", self.config().name()),
            }
            .into()
        })
    }

    /// The set's transport, falling back to the member kind's.
    pub fn transport(&self) -> Result<Rc<dyn Transport>> {
        pick_transport(
            &[self.config().transport(), self.config().record().transport()],
            || format!("set {}", self.config().name()),
        )
    }

    /// Turns a server payload into member attributes.
    ///
    /// With `parse`, the set's parser splits the payload and each item goes
    /// through the record kind's parser. Items that are not objects are dropped.
    pub fn parse_response(&self, payload: &serde_json::Value, parse: bool) -> Vec<Attributes> {
        self.config()
            .split(payload)
            .iter()
            .filter_map(|item| {
                if parse {
                    self.config().record().parse(item)
                } else {
                    attributes_from_json(item)
                }
            })
            .collect()
    }

    /// Reads the members from the server, then reconciles or resets.
    pub fn fetch(&self, options: SetFetchOptions) -> Result<()> {
        let SetFetchOptions {
            reset,
            reconcile,
            parse,
            url,
            handlers: Handlers { success, error },
        } = options;
        let transport = self.transport()?;
        let url = match url {
            Some(url) => url,
            None => self.url()?,
        };

        let set = self.clone();
        let failed = self.clone();
        let options = SyncOptions::new()
            .with_url(Some(url))
            .on_success(move |response| {
                let attributes = set.parse_response(&response, parse);
                if reset {
                    set.reset(
                        attributes,
                        &ResetOptions {
                            silent: reconcile.silent,
                            validate: reconcile.validate,
                        },
                    );
                } else {
                    set.set(attributes, &reconcile);
                }
                if let Some(success) = success {
                    success(&set, &response);
                }
                set.trigger("sync", &SetEvent::Sync {
                    set: set.clone(),
                    response,
                });
            })
            .on_error(move |transport_error| {
                tracing::warn!(set = %failed.config().name(), error = %transport_error, "fetch failed");
                if let Some(error) = error {
                    error(&failed, &transport_error);
                }
                failed.trigger("error", &SetEvent::Error {
                    set: failed.clone(),
                    error: transport_error,
                });
            });

        tracing::debug!(set = %self.config().name(), url = ?options.url, "fetch");
        self.trigger("request", &SetEvent::Request {
            set: self.clone(),
            verb: Verb::Read,
        });
        transport.sync(Verb::Read, SyncTarget::Set(self.clone()), options)
    }

    /// Creates a member and saves it.
    ///
    /// The record is added right away, or only once the server confirms when
    /// `wait` is set. Returns `None` when the input fails validation before
    /// anything is sent.
    pub fn create(&self, input: impl Into<Input>, mut options: SaveOptions) -> Result<Option<Record>> {
        let Some(record) = self.prepare(input.into(), &options.set) else {
            return Ok(None);
        };
        if options.wait {
            let set = self.clone();
            let success = options.handlers.success.take();
            options.handlers.success = Some(Box::new(move |record: &Record, response: &serde_json::Value| {
                set.add([record.clone()], &AddOptions::default());
                if let Some(success) = success {
                    success(record, response);
                }
            }));
        } else {
            self.add([record.clone()], &AddOptions::default());
        }
        record.save(None, options)?;
        Ok(Some(record))
    }
}
