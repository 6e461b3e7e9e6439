use crate::entry::{EntryId, EntryKind, STAR_ID};
use crate::permissions::{ADMINISTRATE, MOVE, READ};
use crate::state::DataStore;
use crate::wire::*;
use beam_service::slots::PreHook;
use beam_service::{ClientHandle, Servlet, ServiceRequestException, ServiceSlots, Session};
use std::sync::Arc;

/// The reference service-locator (§4.10): a directory tree of accounts
/// and directories, a service-registration table, and the session
/// handshake (§4.9) dependent services authenticate against through
/// `crate::authority::LocatorSessionAuthority`.
///
/// `LoginService`/`SessionAuthenticationService` are left ungated — a
/// connection must be able to call them before it has a session at
/// all — while every other operation is gated behind
/// `Session::is_logged_in` the same way `AuthenticationServletAdapter`
/// gates an inner servlet, built directly here since the locator is its
/// own authority rather than a dependent wrapped by one.
pub struct ServiceLocatorServlet {
    store: Arc<DataStore>,
}

impl ServiceLocatorServlet {
    pub fn new(store: Arc<DataStore>) -> Self {
        ServiceLocatorServlet { store }
    }

    pub fn store(&self) -> Arc<DataStore> {
        self.store.clone()
    }
}

/// The caller's logged-in account, or a "Not logged in." exception —
/// every call site here runs behind the `is_logged_in` pre-hook, so the
/// `None` branch is unreachable in practice but still a typed failure
/// rather than a panic.
fn caller_account(client: &ClientHandle) -> Result<EntryId, ServiceRequestException> {
    client.session().account().map(|a| a as EntryId).ok_or_else(|| ServiceRequestException::new("Not logged in."))
}

/// Requires the caller hold `mask` on `target` (§4.10: "every read
/// service is permission-gated by READ on target … every mutation by
/// ADMINISTRATE (directories) or MOVE (association)"), surfaced as
/// `ServiceRequestException("Insufficient permissions.")` per §7.
fn require_permission(
    store: &DataStore,
    client: &ClientHandle,
    target: EntryId,
    mask: u8,
) -> Result<EntryId, ServiceRequestException> {
    let account = caller_account(client)?;
    if store.with_transaction(|state| state.has_permission(account, target, mask)) {
        Ok(account)
    } else {
        Err(ServiceRequestException::insufficient_permissions())
    }
}

fn directory_entry_info(store: &DataStore, id: u32) -> Result<DirectoryEntryInfo, ServiceRequestException> {
    store.with_transaction(|state| {
        let entry = state.entries.get(&id).ok_or_else(|| ServiceRequestException::new("Entry does not exist."))?;
        Ok(DirectoryEntryInfo {
            kind: match entry.kind {
                EntryKind::Account => 0,
                EntryKind::Directory => 1,
            },
            id: entry.id,
            name: entry.name.clone(),
        })
    })
}

fn notify_availability(subscribers: Vec<ClientHandle>, name: String, available: bool) {
    if subscribers.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for client in subscribers {
            let _ = client.send::<ServiceAvailabilityMessage>(ServiceAvailabilityBody {
                name: name.clone(),
                available,
            }).await;
        }
    });
}

/// Pushes `account`'s update only to subscribers holding READ on it
/// (`QueryClientPublisher.hpp`'s permission-filtered publish) — a
/// subscriber without READ simply never learns the account exists.
fn notify_accounts(store: &DataStore, subscribers: Vec<ClientHandle>, account: u32) {
    if subscribers.is_empty() {
        return;
    }
    let permitted: Vec<ClientHandle> = subscribers
        .into_iter()
        .filter(|client| {
            let subscriber = match client.session().account() {
                Some(account) => account as u32,
                None => return false,
            };
            store.with_transaction(|state| state.has_permission(subscriber, account, crate::permissions::READ))
        })
        .collect();
    if permitted.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for client in permitted {
            let _ = client.send::<AccountUpdateMessage>(AccountUpdateBody { account }).await;
        }
    });
}

impl Servlet for ServiceLocatorServlet {
    fn register_services(&self, slots: &mut ServiceSlots) {
        crate::wire::register_wire_types(slots);

        let store = self.store.clone();
        slots.add_slot::<LoginService, _>(move |client, args| {
            if client.session().is_logged_in() {
                return Err(ServiceRequestException::new("Account is already logged in"));
            }
            let (account, session_id) = store.with_transaction(|state| state.login(&args.name, &args.password))?;
            client.with_session(|session| session.log_in(account as i64, session_id.clone()));
            Ok(LoginResult { account, session_id })
        });

        let store = self.store.clone();
        slots.add_slot::<SessionAuthenticationService, _>(move |client, args| {
            match store.with_transaction(|state| state.authenticate_session(&args.key, &args.sha)) {
                Some(account) => {
                    client.with_session(|session| session.log_in(account, String::new()));
                    Ok(true)
                }
                None => Ok(false),
            }
        });

        let mut gated = ServiceSlots::new();

        let store = self.store.clone();
        gated.add_slot::<RegisterService, _>(move |_client, args| {
            let id = store.with_transaction(|state| state.register_service(&args.name, &args.properties, args.owner));
            let subscribers =
                store.with_transaction(|state| state.subscriptions.availability.get(&args.name).cloned().unwrap_or_default());
            notify_availability(subscribers, args.name, true);
            Ok(id)
        });

        let store = self.store.clone();
        gated.add_slot::<UnregisterService, _>(move |_client, args| {
            store.with_transaction(|state| state.unregister_service(&args.name, args.id));
            let (remaining, subscribers) = store.with_transaction(|state| {
                let list = state.locate(&args.name);
                let subs = state.subscriptions.availability.get(&args.name).cloned().unwrap_or_default();
                (!list.is_empty(), subs)
            });
            notify_availability(subscribers, args.name, remaining);
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<LocateService, _>(move |_client, args| {
            let entries = store.with_transaction(|state| state.locate(&args.name));
            Ok(entries
                .into_iter()
                .map(|e| ServiceEntryInfo { id: e.id, name: e.name, properties: e.properties, owner: e.owner })
                .collect())
        });

        let store = self.store.clone();
        gated.add_slot::<SubscribeAvailabilityService, _>(move |client, args| {
            store.with_transaction(|state| {
                state.subscriptions.availability.entry(args.name.clone()).or_insert_with(Vec::new).push(client.clone());
            });
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<UnsubscribeAvailabilityService, _>(move |client, args| {
            store.with_transaction(|state| {
                if let Some(subs) = state.subscriptions.availability.get_mut(&args.name) {
                    subs.retain(|c| !Arc::ptr_eq(c, &client));
                }
            });
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<MonitorDirectoryEntryService, _>(move |client, args| {
            store.with_transaction(|state| {
                state.subscriptions.directory_entries.entry(args.id).or_insert_with(Vec::new).push(client.clone());
            });
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<MonitorAccountsService, _>(move |client, _args| {
            store.with_transaction(|state| state.subscriptions.accounts.push(client.clone()));
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<UnmonitorAccountsService, _>(move |client, _args| {
            store.with_transaction(|state| state.subscriptions.accounts.retain(|c| !Arc::ptr_eq(c, &client)));
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<LoadPathService, _>(move |client, args| {
            require_permission(&store, &client, args.id, READ)?;
            store.with_transaction(|state| {
                let mut path = vec![args.id];
                let mut current = args.id;
                while current != STAR_ID {
                    let parent = state
                        .entries
                        .get(&current)
                        .and_then(|e| e.parents.iter().next().copied())
                        .ok_or_else(|| ServiceRequestException::new("Entry has no path to the root."))?;
                    path.push(parent);
                    current = parent;
                }
                path.reverse();
                Ok(path)
            })
        });

        let store = self.store.clone();
        gated.add_slot::<LoadDirectoryEntryService, _>(move |client, args| {
            require_permission(&store, &client, args.id, READ)?;
            directory_entry_info(&store, args.id)
        });

        let store = self.store.clone();
        gated.add_slot::<LoadParentsService, _>(move |client, args| {
            require_permission(&store, &client, args.id, READ)?;
            store.with_transaction(|state| {
                state
                    .entries
                    .get(&args.id)
                    .map(|e| e.parents.iter().copied().collect())
                    .ok_or_else(|| ServiceRequestException::new("Entry does not exist."))
            })
        });

        let store = self.store.clone();
        gated.add_slot::<LoadChildrenService, _>(move |client, args| {
            require_permission(&store, &client, args.id, READ)?;
            store.with_transaction(|state| {
                state
                    .entries
                    .get(&args.id)
                    .map(|e| e.children.iter().copied().collect())
                    .ok_or_else(|| ServiceRequestException::new("Entry does not exist."))
            })
        });

        let store = self.store.clone();
        gated.add_slot::<LoadAllAccountsService, _>(move |client, _args| {
            let account = caller_account(&client)?;
            Ok(store.with_transaction(|state| {
                state.all_accounts().into_iter().filter(|id| state.has_permission(account, *id, READ)).collect()
            }))
        });

        let store = self.store.clone();
        gated.add_slot::<FindAccountService, _>(move |_client, args| Ok(store.with_transaction(|state| state.find_account(&args.name))));

        let store = self.store.clone();
        gated.add_slot::<MakeAccountService, _>(move |client, args| {
            require_permission(&store, &client, args.parent, ADMINISTRATE)?;
            let id = store.with_transaction(|state| state.make_account(&args.name, &args.password, args.parent))?;
            let subscribers = store.with_transaction(|state| state.subscriptions.accounts.clone());
            notify_accounts(&store, subscribers, id);
            Ok(id)
        });

        let store = self.store.clone();
        gated.add_slot::<MakeDirectoryService, _>(move |client, args| {
            require_permission(&store, &client, args.parent, ADMINISTRATE)?;
            store.with_transaction(|state| state.make_directory(&args.name, args.parent))
        });

        let store = self.store.clone();
        gated.add_slot::<DeleteDirectoryEntryService, _>(move |client, args| {
            require_permission(&store, &client, args.id, ADMINISTRATE)?;
            store.with_transaction(|state| {
                state.delete(args.id)?;
                state.subscriptions.directory_entries.remove(&args.id);
                Ok(true)
            })
        });

        let store = self.store.clone();
        gated.add_slot::<AssociateService, _>(move |client, args| {
            require_permission(&store, &client, args.parent, MOVE)?;
            store.with_transaction(|state| state.associate(args.child, args.parent))?;
            let subscribers = store.with_transaction(|state| {
                let mut subs = state.subscriptions.directory_entries.get(&args.parent).cloned().unwrap_or_default();
                subs.extend(state.subscriptions.directory_entries.get(&args.child).cloned().unwrap_or_default());
                subs
            });
            if !subscribers.is_empty() {
                let body = DirectoryEntryAssociatedBody { child: args.child, parent: args.parent };
                tokio::spawn(async move {
                    for client in subscribers {
                        let _ = client.send::<DirectoryEntryAssociatedMessage>(body.clone()).await;
                    }
                });
            }
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<DetachService, _>(move |client, args| {
            require_permission(&store, &client, args.parent, MOVE)?;
            store.with_transaction(|state| state.detach(args.child, args.parent))?;
            let subscribers = store.with_transaction(|state| {
                let mut subs = state.subscriptions.directory_entries.get(&args.parent).cloned().unwrap_or_default();
                subs.extend(state.subscriptions.directory_entries.get(&args.child).cloned().unwrap_or_default());
                subs
            });
            if !subscribers.is_empty() {
                let body = DirectoryEntryDetachedBody { child: args.child, parent: args.parent };
                tokio::spawn(async move {
                    for client in subscribers {
                        let _ = client.send::<DirectoryEntryDetachedMessage>(body.clone()).await;
                    }
                });
            }
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<StorePasswordService, _>(move |client, args| {
            let account = caller_account(&client)?;
            if account != args.account
                && !store.with_transaction(|state| state.has_permission(account, args.account, ADMINISTRATE))
            {
                return Err(ServiceRequestException::insufficient_permissions());
            }
            store.with_transaction(|state| state.store_password(args.account, &args.password))?;
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<HasPermissionsService, _>(move |client, args| {
            require_permission(&store, &client, args.source, ADMINISTRATE)?;
            require_permission(&store, &client, args.target, ADMINISTRATE)?;
            Ok(store.with_transaction(|state| state.has_permission(args.source, args.target, args.mask)))
        });

        let store = self.store.clone();
        gated.add_slot::<StorePermissionsService, _>(move |client, args| {
            require_permission(&store, &client, args.source, ADMINISTRATE)?;
            require_permission(&store, &client, args.target, ADMINISTRATE)?;
            store.with_transaction(|state| {
                state.store_permissions(args.source, args.target, crate::permissions::Permissions(args.mask))
            });
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<LoadRegistrationTimeService, _>(move |client, args| {
            require_permission(&store, &client, args.id, READ)?;
            Ok(store.with_transaction(|state| state.registration_time(args.id)))
        });

        let store = self.store.clone();
        gated.add_slot::<LoadLastLoginTimeService, _>(move |client, args| {
            require_permission(&store, &client, args.id, READ)?;
            Ok(store.with_transaction(|state| state.last_login_time(args.id)))
        });

        let store = self.store.clone();
        gated.add_slot::<RenameService, _>(move |client, args| {
            require_permission(&store, &client, args.id, ADMINISTRATE)?;
            store.with_transaction(|state| state.rename(args.id, &args.name))?;
            Ok(true)
        });

        let store = self.store.clone();
        gated.add_slot::<AuthenticateAccountService, _>(move |client, args| {
            let account = caller_account(&client)?;
            let target = store.with_transaction(|state| state.find_account(&args.name));
            if let Some(target) = target {
                if !store.with_transaction(|state| state.has_permission(account, target, ADMINISTRATE)) {
                    return Err(ServiceRequestException::insufficient_permissions());
                }
            }
            Ok(store.with_transaction(|state| state.login(&args.name, &args.password)).is_ok())
        });

        let hook: PreHook = Arc::new(|session: &Session| {
            if session.is_logged_in() {
                Ok(())
            } else {
                Err(ServiceRequestException::new("Not logged in."))
            }
        });
        gated.add_pre_hook_to_all_request_slots(hook);
        slots.add(gated);
    }

    fn handle_close(&self, client: ClientHandle) {
        self.store.with_transaction(|state| state.subscriptions.remove_client(&client));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::STAR_ID;
    use beam_channel::duplex_pair;
    use beam_codec::{NullDecoder, NullEncoder};
    use beam_protocol::{MessageProtocol, MessageTransport};
    use beam_service::ServiceProtocolClient;
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;
    use std::time::Duration;

    fn test_logger() -> slog::Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    fn make_pair() -> (Arc<dyn MessageTransport>, Arc<dyn MessageTransport>) {
        let (client_channel, server_channel) = duplex_pair(8192);
        let client: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(client_channel, NullEncoder, NullDecoder));
        let server: Arc<dyn MessageTransport> = Arc::new(MessageProtocol::new(server_channel, NullEncoder, NullDecoder));
        (client, server)
    }

    #[tokio::test]
    async fn login_then_make_directory_round_trips() {
        let store = Arc::new(DataStore::new());
        store.with_transaction(|state| state.bootstrap_root_account("root", "hunter2").unwrap());
        let servlet = Arc::new(ServiceLocatorServlet::new(store));

        let mut server_slots = ServiceSlots::new();
        servlet.register_services(&mut server_slots);

        let (client_transport, server_transport) = make_pair();
        let server = ServiceProtocolClient::new(server_transport, Arc::new(server_slots), Duration::from_secs(30), false, test_logger());

        let mut client_slots = ServiceSlots::new();
        crate::wire::register_wire_types(&mut client_slots);
        let client = ServiceProtocolClient::new(client_transport, Arc::new(client_slots), Duration::from_secs(30), false, test_logger());

        let before = client
            .send_request::<MakeDirectoryService>(MakeDirectoryArgs { name: "docs".to_string(), parent: STAR_ID })
            .await;
        assert!(before.is_err());

        let login = client
            .send_request::<LoginService>(LoginArgs { name: "root".to_string(), password: "hunter2".to_string() })
            .await
            .unwrap();
        assert_eq!(login.session_id.len(), 32);

        let dir = client
            .send_request::<MakeDirectoryService>(MakeDirectoryArgs { name: "docs".to_string(), parent: STAR_ID })
            .await
            .unwrap();
        let info = client.send_request::<LoadDirectoryEntryService>(EntryIdArgs { id: dir }).await.unwrap();
        assert_eq!(info.name, "docs");

        client.close().await;
        server.close().await;
    }
}
