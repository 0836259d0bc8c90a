//! The backend adapter contract, split by capability.
//!
//! A concrete backend implements every trait below; [`Backend`] is then
//! implemented automatically. Optional capabilities come with a default
//! that either does nothing safely or reports `NotImplemented`, so a
//! backend opts in by overriding them.

use async_trait::async_trait;

use crate::ancillary::{
    AutodiscoverResult, MeetingResponse, OutgoingMail, SearchQuery, SearchResults, Settings,
    SettingsOutcome, SettingsRequest, SettingsUpdate, SpecialFolder,
};
use crate::body::CollectionOptions;
use crate::changes::ChangeQuery;
use crate::config::HeartbeatConfig;
use crate::context::BackendContext;
use crate::error::BackendError;
use crate::folder::{CollectionClass, FolderObject, FolderStat};
use crate::message::{Attachment, ChangeOutcome, MessageObject, MessageStat};
use crate::policy::PolicySet;
use crate::session::DeviceContext;

/// Identity and session setup.
///
/// The defaults only record identities in the [`BackendContext`]; a
/// backend that validates credentials overrides `logon`.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    fn context(&self) -> &BackendContext;

    fn context_mut(&mut self) -> &mut BackendContext;

    async fn logon(
        &mut self,
        username: &str,
        password: &str,
        domain: Option<&str>,
    ) -> Result<bool, BackendError> {
        Ok(self.context_mut().logon(username, password, domain))
    }

    /// The authenticated user recorded by `logon`.
    fn get_user(&self) -> Option<&str> {
        self.context().auth_user()
    }

    async fn log_off(&mut self) -> Result<bool, BackendError> {
        Ok(self.context_mut().log_off())
    }

    /// Bind the user whose data is synchronized. Must precede any folder or
    /// item operation.
    async fn setup(&mut self, user: &str) -> Result<bool, BackendError> {
        Ok(self.context_mut().setup(user))
    }
}

/// Folder hierarchy enumeration and mutation.
#[async_trait]
pub trait HierarchyBackend: SessionBackend {
    /// Stats of every folder visible to the synchronizing user.
    async fn get_folder_list(&self) -> Result<Vec<FolderStat>, BackendError>;

    /// Full metadata for one folder; `NotFound` for an unknown id.
    async fn get_folder(&self, id: &str) -> Result<FolderObject, BackendError>;

    /// Full metadata for every visible folder.
    async fn get_folders(&self) -> Result<Vec<FolderObject>, BackendError>;

    async fn stat_folder(&self, id: &str) -> Result<FolderStat, BackendError>;

    /// Create (`id` is `None`) or rename/move a folder.
    async fn change_folder(
        &self,
        _id: Option<&str>,
        _display_name: &str,
        _parent: &str,
    ) -> Result<FolderStat, BackendError> {
        Err(BackendError::not_implemented("change_folder"))
    }

    async fn delete_folder(&self, _id: &str, _parent: &str) -> Result<(), BackendError> {
        Err(BackendError::not_implemented("delete_folder"))
    }
}

/// Cheap change detection.
#[async_trait]
pub trait ChangesBackend: SessionBackend {
    /// Ids of items in `folder_id` whose state changed inside the query's
    /// window.
    ///
    /// Read only: calling it repeatedly with overlapping windows has no
    /// side effects. In ping mode the result only signals that something
    /// changed and must hold a subset of the non-ping result.
    async fn get_server_changes(
        &self,
        folder_id: &str,
        query: &ChangeQuery,
    ) -> Result<Vec<String>, BackendError>;

    async fn stat_message(&self, folder_id: &str, id: &str) -> Result<MessageStat, BackendError>;

    /// Like `stat_message`, with the mail only flags filled in.
    async fn stat_mail_message(
        &self,
        folder_id: &str,
        id: &str,
    ) -> Result<MessageStat, BackendError>;
}

/// Item retrieval and mutation.
#[async_trait]
pub trait MessageBackend: SessionBackend {
    /// `NotFound` when `id` is not in the folder.
    async fn get_message(
        &self,
        folder_id: &str,
        id: &str,
        options: &CollectionOptions,
    ) -> Result<MessageObject, BackendError>;

    /// Create (`id` is `None`) or update an item.
    ///
    /// Business conflicts come back as [`ChangeOutcome::Rejected`]; only
    /// transport or backend faults are errors.
    async fn change_message(
        &self,
        folder_id: &str,
        id: Option<&str>,
        message: &MessageObject,
        device: &DeviceContext,
    ) -> Result<ChangeOutcome, BackendError>;

    async fn delete_message(&self, folder_id: &str, ids: &[String]) -> Result<(), BackendError>;

    async fn set_read_flag(&self, folder_id: &str, id: &str, read: bool)
        -> Result<(), BackendError>;

    /// Move items; returns their new ids in input order.
    async fn move_message(
        &self,
        _folder_id: &str,
        _ids: &[String],
        _new_folder_id: &str,
    ) -> Result<Vec<String>, BackendError> {
        Err(BackendError::not_implemented("move_message"))
    }
}

/// Independent leaf capabilities.
#[async_trait]
pub trait AncillaryBackend: SessionBackend {
    /// Answer a meeting request; returns the id of the calendar item.
    async fn meeting_response(&self, _response: &MeetingResponse) -> Result<String, BackendError> {
        Err(BackendError::not_implemented("meeting_response"))
    }

    async fn get_search_results(
        &self,
        _query: &SearchQuery,
    ) -> Result<SearchResults, BackendError> {
        Err(BackendError::not_implemented("get_search_results"))
    }

    async fn get_attachment(&self, _name: &str) -> Result<Attachment, BackendError> {
        Err(BackendError::not_implemented("get_attachment"))
    }

    async fn item_operations_attachment(
        &self,
        _file_reference: &str,
    ) -> Result<Attachment, BackendError> {
        Err(BackendError::not_implemented("item_operations_attachment"))
    }

    async fn item_operations_mailbox(
        &self,
        _folder_id: &str,
        _id: &str,
        _options: &CollectionOptions,
    ) -> Result<MessageObject, BackendError> {
        Err(BackendError::not_implemented("item_operations_mailbox"))
    }

    async fn item_operations_document_library(
        &self,
        _link: &str,
    ) -> Result<Attachment, BackendError> {
        Err(BackendError::not_implemented("item_operations_document_library"))
    }

    async fn send_mail(&self, _mail: &OutgoingMail) -> Result<(), BackendError> {
        Err(BackendError::not_implemented("send_mail"))
    }

    async fn get_special_folder_name_by_type(
        &self,
        _folder: SpecialFolder,
    ) -> Result<String, BackendError> {
        Err(BackendError::not_implemented("get_special_folder_name_by_type"))
    }

    /// The policy set in force; defaults to the configured one.
    async fn get_current_policy(&self) -> Result<PolicySet, BackendError> {
        Ok(self.context().policies().clone())
    }

    async fn get_settings(&self, _request: SettingsRequest) -> Result<Settings, BackendError> {
        Err(BackendError::not_implemented("get_settings"))
    }

    async fn set_settings(
        &self,
        _update: &SettingsUpdate,
    ) -> Result<SettingsOutcome, BackendError> {
        Err(BackendError::not_implemented("set_settings"))
    }

    async fn auto_discover(&self) -> Result<AutodiscoverResult, BackendError> {
        Err(BackendError::not_implemented("auto_discover"))
    }

    async fn get_username_from_email(&self, _email: &str) -> Result<String, BackendError> {
        Err(BackendError::not_implemented("get_username_from_email"))
    }

    /// Trash folder for deleted items of `class`; `None` deletes outright.
    async fn get_waste_basket(
        &self,
        _class: CollectionClass,
    ) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    /// Whether the backend wants the pinged collection set changed.
    async fn alter_ping(&self, _folder_ids: &[String]) -> Result<bool, BackendError> {
        Ok(false)
    }

    fn get_heartbeat_config(&self) -> HeartbeatConfig {
        *self.context().heartbeat()
    }
}

/// The complete adapter contract.
pub trait Backend: HierarchyBackend + ChangesBackend + MessageBackend + AncillaryBackend {}

impl<T> Backend for T where
    T: HierarchyBackend + ChangesBackend + MessageBackend + AncillaryBackend
{
}
