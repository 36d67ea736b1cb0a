//! Telemetry: service status, alarm rules and messages

use async_trait::async_trait;
use itest_client::{
    Body, Calculation, MessageList, NewRule, Request, Result, Rule, RuleList, ServiceStatus,
    Severity, StatusCode,
};

use crate::assertions::{ensure, ensure_eq, ensure_non_empty};
use crate::fixtures;
use crate::scenario::{Fixture, Scenario, ScenarioContext, Service};

/// GET /status with a custom header
pub struct TelemetryStatus;

#[async_trait]
impl Scenario for TelemetryStatus {
    fn name(&self) -> &'static str {
        "telemetry_status"
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, _fixture: &Fixture) -> Result<()> {
        let services = ctx.services();
        let request = Request::get(services.status.endpoint().url().clone()).header("X-Foo", "Bar");

        let status: ServiceStatus = services.status.send(request).await?.expect_ok_json()?;
        ensure(
            status.is_healthy(),
            format!("telemetry reports status {:?}", status.status),
        )
    }
}

/// Rules need a device group to attach to
async fn rule_setup(ctx: &mut ScenarioContext) -> Result<Fixture> {
    Ok(Fixture {
        device_group_id: Some(fixtures::dependent_device_group(ctx).await?),
        ..Fixture::default()
    })
}

async fn create_rule(ctx: &mut ScenarioContext, request: &NewRule) -> Result<Rule> {
    let services = ctx.services();
    ctx.create_tracked(&services.rules, Body::json(request)?)
        .await
}

/// Every field the request set must come back unchanged
fn check_rule(request: &NewRule, rule: &Rule) -> Result<()> {
    ensure_non_empty("Id", Some(rule.id.as_str()))?;
    ensure_eq("Name", &request.name, &rule.name)?;
    ensure_eq("Description", &request.description, &rule.description)?;
    ensure_eq("GroupId", &request.group_id, &rule.group_id)?;
    ensure_eq("Severity", request.severity, rule.severity)?;
    ensure_eq("Enabled", request.enabled, rule.enabled)?;
    ensure_eq("Calculation", request.calculation, rule.calculation)?;
    ensure_eq("TimePeriod", &request.time_period, &rule.time_period)?;
    ensure_eq("Conditions", &request.conditions, &rule.conditions)
}

/// Create a rule with one calculation variant
pub struct CreateRule {
    name: &'static str,
    calculation: Calculation,
}

impl CreateRule {
    pub const fn new(name: &'static str, calculation: Calculation) -> Self {
        Self { name, calculation }
    }
}

#[async_trait]
impl Scenario for CreateRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        rule_setup(ctx).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let name = ctx.unique_name("itest-rule");
        let request = fixtures::new_rule(&name, fixture.device_group_id()?, self.calculation);

        let rule = create_rule(ctx, &request).await?;

        ensure_eq("Conditions[0]", &request.conditions[0], &rule.conditions[0])?;
        ensure_eq("Enabled", true, rule.enabled)?;
        check_rule(&request, &rule)
    }
}

pub struct RuleRoundTrip;

#[async_trait]
impl Scenario for RuleRoundTrip {
    fn name(&self) -> &'static str {
        "rule_round_trip"
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        rule_setup(ctx).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let name = ctx.unique_name("itest-rule");
        let request = fixtures::new_rule(&name, fixture.device_group_id()?, Calculation::Average);
        let created = create_rule(ctx, &request).await?;

        let services = ctx.services();
        let fetched: Rule = services.rules.get(&created.id, None).await?.expect_ok_json()?;

        ensure_eq("Id", &created.id, &fetched.id)?;
        check_rule(&request, &fetched)
    }
}

/// PUT on an existing rule changes what it says it changes
pub struct UpdateRule;

#[async_trait]
impl Scenario for UpdateRule {
    fn name(&self) -> &'static str {
        "rule_update"
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        rule_setup(ctx).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let name = ctx.unique_name("itest-rule");
        let request = fixtures::new_rule(&name, fixture.device_group_id()?, Calculation::Instant);
        let created = create_rule(ctx, &request).await?;

        let update = NewRule {
            name: format!("{}-updated", name),
            severity: Severity::Warning,
            enabled: false,
            e_tag: created.e_tag.clone(),
            ..request
        };

        let services = ctx.services();
        let updated: Rule = services
            .rules
            .put(&created.id, Body::json(&update)?)
            .await?
            .expect_ok_json()?;
        ensure_eq("Id", &created.id, &updated.id)?;
        check_rule(&update, &updated)?;

        let fetched: Rule = services.rules.get(&created.id, None).await?.expect_ok_json()?;
        check_rule(&update, &fetched)
    }
}

pub struct ListRules;

#[async_trait]
impl Scenario for ListRules {
    fn name(&self) -> &'static str {
        "rule_list"
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        rule_setup(ctx).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let name = ctx.unique_name("itest-rule");
        let request = fixtures::new_rule(&name, fixture.device_group_id()?, Calculation::Instant);
        let created = create_rule(ctx, &request).await?;

        let services = ctx.services();
        let rules: RuleList = services.rules.list().await?.expect_ok_json()?;
        ensure(
            rules.items.iter().any(|r| r.id == created.id),
            format!("rule {} missing from list of {}", created.id, rules.items.len()),
        )
    }
}

pub struct DeleteRule;

#[async_trait]
impl Scenario for DeleteRule {
    fn name(&self) -> &'static str {
        "rule_delete"
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        rule_setup(ctx).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let name = ctx.unique_name("itest-rule");
        let request = fixtures::new_rule(&name, fixture.device_group_id()?, Calculation::Instant);
        let created = create_rule(ctx, &request).await?;

        let services = ctx.services();
        services
            .rules
            .delete(&created.id)
            .await?
            .expect_status(StatusCode::OK)?;
        ctx.untrack(&services.rules, &created.id);

        services
            .rules
            .get(&created.id, None)
            .await?
            .expect_status(StatusCode::NOT_FOUND)?;
        Ok(())
    }
}

/// Messages show up once the simulation is running
pub struct ListMessages;

#[async_trait]
impl Scenario for ListMessages {
    fn name(&self) -> &'static str {
        "messages_list"
    }

    fn service(&self) -> Service {
        Service::Telemetry
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        fixtures::wait_for_seed_data(ctx).await?;
        fixtures::wait_for_messages(ctx).await?;
        Ok(Fixture::default())
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, _fixture: &Fixture) -> Result<()> {
        let services = ctx.services();
        let messages: MessageList = services.messages.list().await?.expect_ok_json()?;
        ensure(
            !messages.items.is_empty(),
            "telemetry returned no messages",
        )
    }
}
