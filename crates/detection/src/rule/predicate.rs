//! 이름 있는 판별식 레지스트리
//!
//! 규칙 정의는 `detection.predicate`에 이름만 적고, 실제 로직은 이 레지스트리에서
//! 찾아 연결합니다. 내장 판별식은 [`builtin`](super::builtin)에 있습니다.

use std::collections::HashMap;
use std::sync::Arc;

use logwarden_core::types::Event;

use super::builtin;

/// 단일 이벤트 판별식. 매칭되면 사유를 반환합니다.
pub type Predicate = Arc<dyn Fn(&Event) -> Option<String> + Send + Sync>;

/// 판별식 레지스트리
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, Predicate>,
}

impl PredicateRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 판별식이 등록된 레지스트리를 생성합니다.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtin::PRIVILEGE_ESCALATION, builtin::privilege_escalation);
        registry.register(builtin::SENSITIVE_FILE_ACCESS, builtin::sensitive_file_access);
        registry.register(builtin::DATA_EXFILTRATION, builtin::data_exfiltration);
        registry
    }

    /// 판별식을 등록합니다. 같은 이름이 있으면 교체됩니다.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Event) -> Option<String> + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    /// 이름으로 판별식을 찾습니다.
    pub fn get(&self, name: &str) -> Option<Predicate> {
        self.predicates.get(name).cloned()
    }

    /// 등록된 판별식 이름 목록 (정렬됨)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("predicates", &self.names())
            .finish()
    }
}
