//! Record persistence: fetch, save and destroy through the transport boundary.

use std::rc::Rc;

use percent_encoding::utf8_percent_encode;

use super::{DestroyOptions, FetchOptions, Record, RecordEvent, SaveOptions};
use crate::{
    Result,
    events::Observable,
    sync::{
        ErrorFn, SyncError, SyncOptions, SyncTarget, Transport, TransportError, URI_COMPONENT,
        Verb, pick_transport,
    },
    value::{Attributes, attributes_from_json},
};

impl Record {
    /// URL of this record's remote resource.
    ///
    /// The base is the kind's URL root, or else the owning set's URL. Saved
    /// records append their percent-encoded identity.
    pub fn url(&self) -> Result<String> {
        let base = match self.config().url_root() {
            Some(root) => root.to_string(),
            None => match self.collection() {
                Some(set) => set.url()?,
                None => {
                    return Err(SyncError::MissingUrl {
                        target: format!("record {}", self.cid()),
                    }
                    .into());
                }
            },
        };
        match self.id_key() {
            None => Ok(base),
            Some(key) => {
                let separator = if base.ends_with('/') { "" } else { "/" };
                Ok(format!(
                    "{base}{separator}{}",
                    utf8_percent_encode(&key, URI_COMPONENT)
                ))
            }
        }
    }

    /// Reads the record from the server and applies the response.
    pub fn fetch(&self, options: FetchOptions) -> Result<()> {
        let FetchOptions {
            set,
            parse,
            url,
            handlers,
        } = options;
        let error = self.error_handler(handlers.error);
        let success = handlers.success;
        let record = self.clone();
        let options = SyncOptions::new()
            .with_url(url)
            .on_success(move |response| {
                if let Some(attributes) = record.response_attributes(&response, parse)
                    && record.set(attributes, &set).is_err()
                {
                    return;
                }
                if let Some(success) = success {
                    success(&record, &response);
                }
                record.trigger("sync", &RecordEvent::Sync {
                    record: record.clone(),
                    response,
                });
            })
            .on_error(error);
        self.sync(Verb::Read, options)
    }

    /// Persists the record, optionally applying `attributes` first.
    ///
    /// Returns `Ok(false)` without contacting the transport when validation
    /// rejects the change. New records are created, saved ones updated, or
    /// patched with only `attributes` when `patch` is set. With `wait`, the
    /// new attributes are sent but only applied once the server confirms.
    pub fn save(&self, attributes: Option<Attributes>, options: SaveOptions) -> Result<bool> {
        let SaveOptions {
            set,
            wait,
            patch,
            parse,
            url,
            handlers,
        } = options;

        // An immediate `set` has already validated the result
        let applied = match &attributes {
            Some(attributes) if !wait => {
                if self.set(attributes.clone(), &set).is_err() {
                    return Ok(false);
                }
                true
            }
            _ => false,
        };
        let proposed = attributes.clone().unwrap_or_default();
        if !applied && self.check_valid(&proposed, &set).is_err() {
            return Ok(false);
        }

        let verb = if self.is_new() {
            Verb::Create
        } else if patch {
            Verb::Patch
        } else {
            Verb::Update
        };
        let payload = match verb {
            Verb::Patch => attributes.clone(),
            _ if wait && attributes.is_some() => {
                let mut staged = self.attributes();
                staged.extend(proposed);
                Some(staged)
            }
            _ => None,
        };

        let error = self.error_handler(handlers.error);
        let success = handlers.success;
        let staged = if wait { attributes } else { None };
        let record = self.clone();
        let options = SyncOptions::new()
            .with_url(url)
            .with_attrs(payload)
            .on_success(move |response| {
                let mut server = record.response_attributes(&response, parse);
                if let Some(mut staged) = staged {
                    staged.extend(server.unwrap_or_default());
                    server = Some(staged);
                }
                if let Some(server) = server
                    && record.set(server, &set).is_err()
                {
                    return;
                }
                if let Some(success) = success {
                    success(&record, &response);
                }
                record.trigger("sync", &RecordEvent::Sync {
                    record: record.clone(),
                    response,
                });
            })
            .on_error(error);
        self.sync(verb, options)?;
        Ok(true)
    }

    /// Deletes the record on the server and announces `"destroy"`.
    ///
    /// Without `wait` the event fires immediately, which removes the record
    /// from any set. A new record is never sent: the event and the success
    /// handler run right away and `Ok(false)` is returned.
    pub fn destroy(&self, options: DestroyOptions) -> Result<bool> {
        let DestroyOptions {
            wait,
            url,
            handlers,
        } = options;

        if self.is_new() {
            self.announce_destroy();
            if let Some(success) = handlers.success {
                success(self, &serde_json::Value::Null);
            }
            return Ok(false);
        }

        let error = self.error_handler(handlers.error);
        let success = handlers.success;
        let record = self.clone();
        let options = SyncOptions::new()
            .with_url(url)
            .on_success(move |response| {
                if wait {
                    record.announce_destroy();
                }
                if let Some(success) = success {
                    success(&record, &response);
                }
                if !record.is_new() {
                    record.trigger("sync", &RecordEvent::Sync {
                        record: record.clone(),
                        response,
                    });
                }
            })
            .on_error(error);
        self.sync(Verb::Delete, options)?;
        if !wait {
            self.announce_destroy();
        }
        Ok(true)
    }

    /// Resolves the URL, announces `"request"` and hands the call to the transport.
    fn sync(&self, verb: Verb, mut options: SyncOptions) -> Result<()> {
        let transport = self.transport()?;
        if options.url.is_none() {
            options.url = Some(self.url()?);
        }
        tracing::debug!(record = %self.cid(), %verb, url = ?options.url, "sync");
        self.trigger("request", &RecordEvent::Request {
            record: self.clone(),
            verb,
        });
        transport.sync(verb, SyncTarget::Record(self.clone()), options)
    }

    fn transport(&self) -> Result<Rc<dyn Transport>> {
        let from_set = self.collection().and_then(|set| set.transport().ok());
        pick_transport(&[self.config().transport(), from_set], || {
            format!("record {}", self.cid())
        })
    }

    fn response_attributes(&self, response: &serde_json::Value, parse: bool) -> Option<Attributes> {
        if parse {
            self.config().parse(response)
        } else {
            attributes_from_json(response)
        }
    }

    fn announce_destroy(&self) {
        self.trigger("destroy", &RecordEvent::Destroy {
            record: self.clone(),
            collection: self.collection(),
        });
    }

    /// Wraps the caller's error handler so `"error"` is always emitted.
    fn error_handler(
        &self,
        handler: Option<Box<dyn FnOnce(&Record, &TransportError)>>,
    ) -> ErrorFn {
        let record = self.clone();
        Box::new(move |error: TransportError| {
            tracing::warn!(record = %record.cid(), %error, "sync failed");
            if let Some(handler) = handler {
                handler(&record, &error);
            }
            record.trigger("error", &RecordEvent::Error {
                record: record.clone(),
                error,
            });
        })
    }
}
