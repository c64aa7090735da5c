//! Ability lifecycle: экипировка, активация, триггеры, выполнение атак
//!
//! # Attack Flow
//!
//! ```text
//! input-слой → TriggerPulse (binding + direction)
//!   ↓ (dispatch по живым подпискам TriggerBindings)
//! AttackIntent (AI пишет их напрямую, минуя триггеры)
//!   ↓ (perform_attacks: phase == Ready && gate.try_start)
//! resolve_attack → AttackLanded (урон) + ApplyEffectRequest (эффекты целей)
//! ```
//!
//! Подписка на триггер возвращает `TriggerToken`; отписка принимает тот же
//! токен. Слушатель не может «отписать не тот closure» — токен хранится в
//! слоте способности и гасится при деактивации.

use bevy::prelude::*;
use std::sync::Arc;

use super::cooldown::CooldownGate;
use super::definitions::{AttackDefinition, AttackId, AttackMode, BonusCondition};
use super::resolver::{resolve_attack, ActorPositions};
use crate::components::Health;
use crate::effects::{ActiveEffects, ApplyEffectRequest, RemoveEffectRequest};

// ============================================================================
// Components
// ============================================================================

/// Фаза жизненного цикла одного слота способности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbilityPhase {
    /// Экипирована, но не активирована (триггер не подключен)
    #[default]
    Inactive,
    /// Активна и готова к выполнению
    Ready,
    /// Активна, идёт cooldown
    Cooling,
}

/// Один экипированный экземпляр способности
///
/// Определение разделяемое (Arc), gate и фаза — свои у каждого владельца.
#[derive(Debug, Clone)]
pub struct AbilityInstance {
    pub attack: Arc<AttackDefinition>,
    pub gate: CooldownGate,
    pub phase: AbilityPhase,
    /// Токен живой подписки на триггер (None пока Inactive или без binding)
    pub token: Option<TriggerToken>,
}

impl AbilityInstance {
    pub fn new(attack: Arc<AttackDefinition>) -> Self {
        Self {
            attack,
            gate: CooldownGate::default(),
            phase: AbilityPhase::Inactive,
            token: None,
        }
    }
}

/// Набор способностей актора
///
/// Слот создаётся при экипировке, умирает вместе с актором или при
/// снятии. Cooldown-состояние никогда не разделяется между акторами,
/// даже если определение одно и то же.
#[derive(Component, Debug, Default)]
pub struct AbilitySet {
    slots: Vec<AbilityInstance>,
}

impl AbilitySet {
    pub fn with_attacks(attacks: Vec<Arc<AttackDefinition>>) -> Self {
        Self {
            slots: attacks.into_iter().map(AbilityInstance::new).collect(),
        }
    }

    pub fn equip(&mut self, attack: Arc<AttackDefinition>) {
        // Один слот на определение — повторная экипировка no-op
        if self.slot(&attack.id).is_none() {
            self.slots.push(AbilityInstance::new(attack));
        }
    }

    /// Снимает слот целиком. Деактивировать нужно ДО снятия — иначе
    /// подписка триггера и self-эффекты остаются висеть.
    pub fn unequip(&mut self, id: &AttackId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| &slot.attack.id != id);
        before != self.slots.len()
    }

    pub fn slot(&self, id: &AttackId) -> Option<&AbilityInstance> {
        self.slots.iter().find(|slot| &slot.attack.id == id)
    }

    pub fn slot_mut(&mut self, id: &AttackId) -> Option<&mut AbilityInstance> {
        self.slots.iter_mut().find(|slot| &slot.attack.id == id)
    }

    pub fn slots(&self) -> &[AbilityInstance] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [AbilityInstance] {
        &mut self.slots
    }

    /// Первая активная способность нужного режима (выбор атаки врагом)
    pub fn active_with_mode(&self, mode: AttackMode) -> Option<&AbilityInstance> {
        self.slots
            .iter()
            .find(|slot| slot.attack.mode == mode && slot.phase != AbilityPhase::Inactive)
    }
}

// ============================================================================
// Trigger bindings (activation-source контракт)
// ============================================================================

/// Токен живой подписки. Выдаётся subscribe, гасится unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerToken(u64);

#[derive(Debug)]
struct TriggerSubscription {
    token: TriggerToken,
    binding: String,
    actor: Entity,
    attack: AttackId,
}

/// Таблица подписок «триггер → (актор, атака)»
///
/// Внешний input-слой шлёт TriggerPulse с именем binding'а; симуляция
/// раздаёт его по подпискам. Это весь контракт — какое устройство стоит
/// за binding'ом, ядро не знает.
#[derive(Resource, Debug, Default)]
pub struct TriggerBindings {
    next_token: u64,
    subscriptions: Vec<TriggerSubscription>,
}

impl TriggerBindings {
    pub fn subscribe(
        &mut self,
        binding: impl Into<String>,
        actor: Entity,
        attack: AttackId,
    ) -> TriggerToken {
        let token = TriggerToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.push(TriggerSubscription {
            token,
            binding: binding.into(),
            actor,
            attack,
        });
        token
    }

    /// true = подписка была и снята; повторная отписка — безопасный no-op
    pub fn unsubscribe(&mut self, token: TriggerToken) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.token != token);
        before != self.subscriptions.len()
    }

    pub fn subscribers<'a>(&'a self, binding: &'a str) -> impl Iterator<Item = (Entity, &'a AttackId)> + 'a {
        self.subscriptions
            .iter()
            .filter(move |sub| sub.binding == binding)
            .map(|sub| (sub.actor, &sub.attack))
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

// ============================================================================
// Events
// ============================================================================

/// Активировать экипированную способность (Inactive → Ready)
///
/// Подключает триггер, накладывает эффекты «на себя».
#[derive(Event, Debug, Clone)]
pub struct ActivateAbility {
    pub actor: Entity,
    pub attack: AttackId,
}

/// Деактивировать способность (любая активная фаза → Inactive)
///
/// Снимает эффекты «на себя», отписывает триггер, гасит cooldown.
#[derive(Event, Debug, Clone)]
pub struct DeactivateAbility {
    pub actor: Entity,
    pub attack: AttackId,
}

/// Импульс от внешнего input-слоя (нажатие binding'а)
#[derive(Event, Debug, Clone)]
pub struct TriggerPulse {
    pub binding: String,
    /// Направление взгляда на момент нажатия
    pub direction: Vec2,
}

/// Намерение выполнить атаку (от триггера или AI)
#[derive(Event, Debug, Clone)]
pub struct AttackIntent {
    pub attacker: Entity,
    pub attack: AttackId,
    pub direction: Vec2,
}

/// Атака выполнена (для логов/UI; hits = число уникальных целей)
#[derive(Event, Debug, Clone)]
pub struct AttackPerformed {
    pub attacker: Entity,
    pub attack: AttackId,
    pub hits: usize,
}

/// Одно попадание по цели (вход damage-системы)
#[derive(Event, Debug, Clone)]
pub struct AttackLanded {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
    pub knockback: Vec2,
}

// ============================================================================
// Systems
// ============================================================================

/// Система: tick всех cooldown gates
///
/// Edge «gate стал готов» переводит слот Cooling → Ready ровно один раз.
pub fn tick_ability_cooldowns(
    mut actors: Query<(Entity, &mut AbilitySet)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut set) in actors.iter_mut() {
        for slot in set.slots_mut() {
            let became_ready = slot.gate.tick(delta);
            if became_ready && slot.phase == AbilityPhase::Cooling {
                slot.phase = AbilityPhase::Ready;
                crate::log(&format!(
                    "⏱️ Ability ready: {} (actor: {:?})",
                    slot.attack.id, entity
                ));
            }
        }
    }
}

/// Система: активация/деактивация способностей
pub fn process_ability_lifecycle(
    mut activations: EventReader<ActivateAbility>,
    mut deactivations: EventReader<DeactivateAbility>,
    mut actors: Query<&mut AbilitySet>,
    mut bindings: ResMut<TriggerBindings>,
    mut apply: EventWriter<ApplyEffectRequest>,
    mut remove: EventWriter<RemoveEffectRequest>,
) {
    for event in activations.read() {
        let Ok(mut set) = actors.get_mut(event.actor) else {
            crate::log_warning(&format!(
                "ActivateAbility: actor {:?} has no AbilitySet",
                event.actor
            ));
            continue;
        };
        let Some(slot) = set.slot_mut(&event.attack) else {
            crate::log_warning(&format!(
                "ActivateAbility: {} not equipped on {:?}",
                event.attack, event.actor
            ));
            continue;
        };

        // Повторная активация — no-op
        if slot.phase != AbilityPhase::Inactive {
            continue;
        }

        slot.phase = AbilityPhase::Ready;
        slot.gate.cancel(); // cooldown всегда стартует свежим

        if let Some(binding) = &slot.attack.binding {
            let token = bindings.subscribe(binding.clone(), event.actor, slot.attack.id.clone());
            slot.token = Some(token);
        }

        for effect in &slot.attack.apply_on_self {
            apply.write(ApplyEffectRequest {
                target: event.actor,
                effect: effect.clone(),
            });
        }

        crate::log(&format!(
            "🍱 Ability activated: {} (actor: {:?})",
            event.attack, event.actor
        ));
    }

    for event in deactivations.read() {
        let Ok(mut set) = actors.get_mut(event.actor) else {
            continue;
        };
        let Some(slot) = set.slot_mut(&event.attack) else {
            continue;
        };

        // Деактивация неактивной — идемпотентный no-op
        if slot.phase == AbilityPhase::Inactive {
            continue;
        }

        slot.phase = AbilityPhase::Inactive;
        slot.gate.cancel();

        // Отписываем ровно тот токен, что выдали при активации
        if let Some(token) = slot.token.take() {
            bindings.unsubscribe(token);
        }

        for effect in &slot.attack.apply_on_self {
            remove.write(RemoveEffectRequest {
                target: event.actor,
                effect: effect.clone(),
            });
        }

        crate::log(&format!(
            "🍽️ Ability deactivated: {} (actor: {:?})",
            event.attack, event.actor
        ));
    }
}

/// Система: раздача TriggerPulse по подпискам
pub fn dispatch_trigger_pulses(
    mut pulses: EventReader<TriggerPulse>,
    bindings: Res<TriggerBindings>,
    mut intents: EventWriter<AttackIntent>,
) {
    for pulse in pulses.read() {
        for (actor, attack) in bindings.subscribers(&pulse.binding) {
            intents.write(AttackIntent {
                attacker: actor,
                attack: attack.clone(),
                direction: pulse.direction,
            });
        }
    }
}

/// Система: выполнение атак (AttackIntent → попадания)
///
/// Intent на Inactive/Cooling слоте — тихий no-op (контракт состояния,
/// не ошибка). Урон и эффекты целей уходят событиями, применяются ниже
/// по конвейеру.
pub fn perform_attacks(
    mut intents: EventReader<AttackIntent>,
    mut attackers: Query<(&mut AbilitySet, &Transform)>,
    candidates: Query<(Entity, &Transform, &Health)>,
    effect_sets: Query<&ActiveEffects>,
    mut landed: EventWriter<AttackLanded>,
    mut performed: EventWriter<AttackPerformed>,
    mut apply_effects: EventWriter<ApplyEffectRequest>,
) {
    for intent in intents.read() {
        let Ok((mut set, transform)) = attackers.get_mut(intent.attacker) else {
            // Атакующий умер/удалён между intent и выполнением
            continue;
        };
        let Some(slot) = set.slot_mut(&intent.attack) else {
            crate::log_warning(&format!(
                "AttackIntent: {} not equipped on {:?}",
                intent.attack, intent.attacker
            ));
            continue;
        };

        // Не активна или уже на cooldown — no-op
        if slot.phase != AbilityPhase::Ready {
            continue;
        }
        if !slot.gate.try_start(&slot.attack) {
            continue;
        }
        slot.phase = AbilityPhase::Cooling;

        let definition = slot.attack.clone();
        let origin = transform.translation.truncate();

        // Снапшот живых акторов — граница внешнего collision-слоя
        let spatial = ActorPositions::new(
            candidates
                .iter()
                .filter(|(_, _, health)| health.is_alive())
                .map(|(entity, transform, _)| (entity, transform.translation.truncate()))
                .collect(),
        );

        let condition_holds = |target: Entity, condition: &BonusCondition| match condition {
            BonusCondition::HasEffect(id) => effect_sets
                .get(target)
                .map(|effects| effects.has(id))
                .unwrap_or(false),
            BonusCondition::HasAnyEffect => effect_sets
                .get(target)
                .map(|effects| !effects.is_empty())
                .unwrap_or(false),
        };

        let hits = resolve_attack(
            &definition,
            intent.attacker,
            origin,
            intent.direction,
            &spatial,
            &condition_holds,
        );

        for hit in &hits {
            landed.write(AttackLanded {
                attacker: intent.attacker,
                target: hit.target,
                damage: hit.damage,
                knockback: hit.knockback,
            });

            for effect in &definition.apply_on_targets {
                apply_effects.write(ApplyEffectRequest {
                    target: hit.target,
                    effect: effect.clone(),
                });
            }
        }

        crate::log(&format!(
            "⚔️ Attack performed: {} (attacker: {:?}, hits: {})",
            definition.id,
            intent.attacker,
            hits.len()
        ));

        performed.write(AttackPerformed {
            attacker: intent.attacker,
            attack: definition.id.clone(),
            hits: hits.len(),
        });
    }
}
