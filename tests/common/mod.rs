//! In-memory GitLab used by the integration tests
//!
//! Implements every capability trait against plain vectors, with a call log
//! so tests can assert which remote calls were (or were not) made.

#![allow(dead_code)]

use async_trait::async_trait;
use gitlab_provider::gitlab::{
    Clients, CreateDeployTokenOptions, CreateVariableOptions, DeployToken, DeployTokensApi,
    ListOptions, Owner, Page, SettingsApi, UpdateVariableOptions, Variable, VariablesApi,
};
use gitlab_provider::{Provider, ProviderError, Registry, Result};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "https://gitlab.example.com/api/v4/";

struct State {
    next_id: u64,
    deploy_tokens: Vec<(Owner, DeployToken)>,
    variables: Vec<(Owner, Variable)>,
    settings: Map<String, Value>,
    delete_status: StatusCode,
    calls: Vec<String>,
}

pub struct FakeGitlab {
    state: Mutex<State>,
    page_size: usize,
    /// GitLab >= 13.4 honours `filter[environment_scope]`
    supports_scope_filter: bool,
}

impl FakeGitlab {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                deploy_tokens: Vec::new(),
                variables: Vec::new(),
                settings: default_settings(),
                delete_status: StatusCode::NO_CONTENT,
                calls: Vec::new(),
            }),
            page_size: 20,
            supports_scope_filter: true,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Behave like GitLab < 13.4
    pub fn without_scope_filter(mut self) -> Self {
        self.supports_scope_filter = false;
        self
    }

    pub fn set_delete_status(&self, status: StatusCode) {
        self.state.lock().unwrap().delete_status = status;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Seed a deploy token and return its ID
    pub fn insert_deploy_token(&self, owner: &Owner, name: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.deploy_tokens.push((
            owner.clone(),
            DeployToken {
                id,
                name: name.to_string(),
                username: format!("gitlab+deploy-token-{}", id),
                expires_at: None,
                scopes: vec!["read_repository".to_string()],
                token: None,
                revoked: false,
                expired: false,
            },
        ));
        id
    }

    pub fn deploy_token_count(&self) -> usize {
        self.state.lock().unwrap().deploy_tokens.len()
    }

    pub fn insert_variable(&self, owner: &Owner, key: &str, value: &str, scope: &str) {
        self.state.lock().unwrap().variables.push((
            owner.clone(),
            Variable {
                key: key.to_string(),
                value: value.to_string(),
                variable_type: Default::default(),
                protected: false,
                masked: false,
                environment_scope: scope.to_string(),
            },
        ));
    }

    pub fn variable(&self, owner: &Owner, key: &str, scope: &str) -> Option<Variable> {
        self.state
            .lock()
            .unwrap()
            .variables
            .iter()
            .find(|(o, v)| o == owner && v.key == key && v.environment_scope == scope)
            .map(|(_, v)| v.clone())
    }

    pub fn settings(&self) -> Map<String, Value> {
        self.state.lock().unwrap().settings.clone()
    }

    pub fn set_setting(&self, name: &str, value: Value) {
        self.state.lock().unwrap().settings.insert(name.to_string(), value);
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn paginate<T: Clone>(&self, items: Vec<T>, options: ListOptions) -> Page<T> {
        let per_page = options.per_page.map_or(self.page_size, |n| n as usize);
        let start = (options.page.max(1) as usize - 1) * per_page;
        let page: Vec<T> = items.iter().skip(start).take(per_page).cloned().collect();
        let next_page = (start + per_page < items.len()).then_some(options.page + 1);
        Page::new(page, next_page)
    }

    /// Index of the variable a keyed call acts on
    fn find_variable(
        state: &State,
        owner: &Owner,
        key: &str,
        scope: &str,
        filtered: bool,
    ) -> Option<usize> {
        state.variables.iter().position(|(o, v)| {
            o == owner && v.key == key && (!filtered || v.environment_scope == scope)
        })
    }
}

fn default_settings() -> Map<String, Value> {
    json!({
        "admin_mode": false,
        "after_sign_out_path": null,
        "akismet_enabled": false,
        "default_projects_limit": 100000,
        "elasticsearch_url": "https://es1.example.com, https://es2.example.com",
        "elasticsearch_project_ids": [],
        "signup_enabled": true,
        "not_in_the_field_table": "ignored",
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn variable_not_found() -> ProviderError {
    ProviderError::NotFound("404 Variable Not Found".to_string())
}

#[async_trait]
impl DeployTokensApi for FakeGitlab {
    async fn create_deploy_token(
        &self,
        owner: &Owner,
        options: &CreateDeployTokenOptions,
    ) -> Result<DeployToken> {
        self.record(format!("create_deploy_token {}", owner));
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;

        let token = DeployToken {
            id,
            name: options.name.clone(),
            username: options
                .username
                .clone()
                .unwrap_or_else(|| format!("gitlab+deploy-token-{}", id)),
            expires_at: options.expires_at,
            scopes: options.scopes.iter().map(|s| s.to_string()).collect(),
            token: None,
            revoked: false,
            expired: false,
        };
        state.deploy_tokens.push((owner.clone(), token.clone()));

        Ok(DeployToken {
            token: Some(format!("secret-{}", id)),
            ..token
        })
    }

    async fn list_deploy_tokens(
        &self,
        owner: &Owner,
        options: ListOptions,
    ) -> Result<Page<DeployToken>> {
        self.record(format!(
            "list_deploy_tokens {} page={} per_page={:?}",
            owner, options.page, options.per_page
        ));
        let tokens: Vec<DeployToken> = self
            .state
            .lock()
            .unwrap()
            .deploy_tokens
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, t)| t.clone())
            .collect();
        Ok(self.paginate(tokens, options))
    }

    async fn delete_deploy_token(&self, owner: &Owner, id: u64) -> Result<StatusCode> {
        self.record(format!("delete_deploy_token {} {}", owner, id));
        let mut state = self.state.lock().unwrap();
        let before = state.deploy_tokens.len();
        state.deploy_tokens.retain(|(o, t)| !(o == owner && t.id == id));
        if state.deploy_tokens.len() == before {
            return Err(ProviderError::NotFound("404 Deploy Token Not Found".to_string()));
        }
        Ok(state.delete_status)
    }
}

#[async_trait]
impl VariablesApi for FakeGitlab {
    async fn list_variables(&self, owner: &Owner, options: ListOptions) -> Result<Page<Variable>> {
        self.record(format!("list_variables {} page={}", owner, options.page));
        let variables: Vec<Variable> = self
            .state
            .lock()
            .unwrap()
            .variables
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, v)| v.clone())
            .collect();
        Ok(self.paginate(variables, options))
    }

    async fn get_variable(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<Variable> {
        self.record(format!("get_variable {} {} {}", owner, key, scope_filter));
        let state = self.state.lock().unwrap();
        Self::find_variable(&state, owner, key, scope_filter, self.supports_scope_filter)
            .map(|i| state.variables[i].1.clone())
            .ok_or_else(variable_not_found)
    }

    async fn create_variable(
        &self,
        owner: &Owner,
        options: &CreateVariableOptions,
    ) -> Result<Variable> {
        self.record(format!("create_variable {} {}", owner, options.key));
        if options.masked && options.value.len() < 8 {
            return Err(ProviderError::Api {
                status: StatusCode::BAD_REQUEST,
                message: "{value: [is invalid]}".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let scope = &options.environment_scope;
        if Self::find_variable(&state, owner, &options.key, scope, true).is_some() {
            return Err(ProviderError::Api {
                status: StatusCode::BAD_REQUEST,
                message: format!("{{key: [({}) has already been taken]}}", options.key),
            });
        }

        let variable = Variable {
            key: options.key.clone(),
            value: options.value.clone(),
            variable_type: options.variable_type,
            protected: options.protected,
            masked: options.masked,
            environment_scope: options.environment_scope.clone(),
        };
        state.variables.push((owner.clone(), variable.clone()));
        Ok(variable)
    }

    async fn update_variable(
        &self,
        owner: &Owner,
        key: &str,
        options: &UpdateVariableOptions,
        scope_filter: &str,
    ) -> Result<Variable> {
        self.record(format!("update_variable {} {} {}", owner, key, scope_filter));
        let mut state = self.state.lock().unwrap();
        let filtered = self.supports_scope_filter;
        let index = Self::find_variable(&state, owner, key, scope_filter, filtered)
            .ok_or_else(variable_not_found)?;

        let variable = &mut state.variables[index].1;
        variable.value = options.value.clone();
        variable.variable_type = options.variable_type;
        variable.protected = options.protected;
        variable.masked = options.masked;
        variable.environment_scope = options.environment_scope.clone();
        Ok(variable.clone())
    }

    async fn remove_variable(&self, owner: &Owner, key: &str, scope_filter: &str) -> Result<()> {
        self.record(format!("remove_variable {} {} {}", owner, key, scope_filter));
        let mut state = self.state.lock().unwrap();
        let filtered = self.supports_scope_filter;
        let index = Self::find_variable(&state, owner, key, scope_filter, filtered)
            .ok_or_else(variable_not_found)?;
        state.variables.remove(index);
        Ok(())
    }
}

#[async_trait]
impl SettingsApi for FakeGitlab {
    fn base_url(&self) -> String {
        BASE_URL.to_string()
    }

    async fn get_settings(&self) -> Result<Map<String, Value>> {
        self.record("get_settings".to_string());
        Ok(self.settings())
    }

    async fn update_settings(&self, changes: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut keys: Vec<&str> = changes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        self.record(format!("update_settings {}", keys.join(",")));

        let mut state = self.state.lock().unwrap();
        for (name, value) in changes {
            state.settings.insert(name.clone(), value.clone());
        }
        Ok(state.settings.clone())
    }
}

/// A provider wired to `fake` for every capability
pub fn provider(fake: &Arc<FakeGitlab>) -> Provider {
    Provider::new(&Registry::gitlab(), Clients::from_backend(fake.clone()))
}

pub fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}
