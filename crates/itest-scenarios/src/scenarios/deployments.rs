//! Device-management: deployments of uploaded packages to device groups

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use itest_client::{Body, Deployment, DeploymentList, NewDeployment, Result, StatusCode};

use crate::assertions::{ensure, ensure_eq, ensure_recent};
use crate::fixtures;
use crate::scenario::{Fixture, Scenario, ScenarioContext, Service};

/// Deployment creation is reflected in `CreatedDateTimeUtc` within this window
const CREATE_WINDOW: Duration = Duration::from_secs(3);
const RETRIEVE_WINDOW: Duration = Duration::from_secs(5);

/// Upload `packages` packages and resolve the dependent device group
async fn deployment_setup(ctx: &mut ScenarioContext, packages: usize) -> Result<Fixture> {
    let mut package_ids = Vec::with_capacity(packages);
    for _ in 0..packages {
        package_ids.push(fixtures::create_package(ctx).await?);
    }
    let device_group_id = fixtures::dependent_device_group(ctx).await?.to_lowercase();

    Ok(Fixture {
        device_group_id: Some(device_group_id),
        package_ids,
    })
}

async fn create_deployment(
    ctx: &mut ScenarioContext,
    request: &NewDeployment,
) -> Result<Deployment> {
    let services = ctx.services();
    ctx.create_tracked(&services.deployments, Body::json(request)?)
        .await
}

fn check_deployment(request: &NewDeployment, deployment: &Deployment) -> Result<()> {
    ensure_eq("Id", request.expected_id(), deployment.id.clone())?;
    ensure_eq("Name", &request.name, &deployment.name)?;
    ensure_eq(
        "DeviceGroupId",
        &request.device_group_id,
        &deployment.device_group_id,
    )?;
    ensure_eq("PackageId", &request.package_id, &deployment.package_id)?;
    ensure_eq("Priority", request.priority, deployment.priority)
}

pub struct CreateDeployment;

#[async_trait]
impl Scenario for CreateDeployment {
    fn name(&self) -> &'static str {
        "deployment_create"
    }

    fn service(&self) -> Service {
        Service::DeviceManagement
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        deployment_setup(ctx, 1).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let request = fixtures::new_deployment(
            "depName",
            fixture.device_group_id()?,
            fixture.package_id()?,
        );

        let deployment = create_deployment(ctx, &request).await?;

        check_deployment(&request, &deployment)?;
        ensure_recent(
            "CreatedDateTimeUtc",
            deployment.created_date_time_utc,
            CREATE_WINDOW,
        )
    }
}

pub struct RetrieveDeployment;

#[async_trait]
impl Scenario for RetrieveDeployment {
    fn name(&self) -> &'static str {
        "deployment_retrieve"
    }

    fn service(&self) -> Service {
        Service::DeviceManagement
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        deployment_setup(ctx, 1).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let request = fixtures::new_deployment(
            "test-retrieve-deployment",
            fixture.device_group_id()?,
            fixture.package_id()?,
        );
        create_deployment(ctx, &request).await?;

        let services = ctx.services();
        let fetched: Deployment = services
            .deployments
            .get(&request.expected_id(), None)
            .await?
            .expect_ok_json()?;

        check_deployment(&request, &fetched)?;
        ensure_recent(
            "CreatedDateTimeUtc",
            fetched.created_date_time_utc,
            RETRIEVE_WINDOW,
        )
    }
}

/// Three packages, one deployment each; the list holds exactly those
pub struct ListDeployments;

impl ListDeployments {
    const COUNT: usize = 3;
}

#[async_trait]
impl Scenario for ListDeployments {
    fn name(&self) -> &'static str {
        "deployment_list"
    }

    fn service(&self) -> Service {
        Service::DeviceManagement
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        deployment_setup(ctx, Self::COUNT).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let prefix = ctx.unique_name("test-retrieve-all-deployments");
        let group = fixture.device_group_id()?;

        for (i, package_id) in fixture.package_ids.iter().enumerate() {
            let request = fixtures::new_deployment(&format!("{}{}", prefix, i), group, package_id);
            create_deployment(ctx, &request).await?;
        }

        let services = ctx.services();
        let listed: DeploymentList = services.deployments.list().await?.expect_ok_json()?;

        let mut expected: HashSet<&str> = fixture.package_ids.iter().map(String::as_str).collect();
        for deployment in listed.items.iter().filter(|d| d.name.starts_with(&prefix)) {
            ensure(
                expected.remove(deployment.package_id.as_str()),
                format!(
                    "deployment {} references package {} that this scenario did not create",
                    deployment.id, deployment.package_id
                ),
            )?;
            ensure_eq("DeviceGroupId", group, deployment.device_group_id.as_str())?;
        }

        ensure(
            expected.is_empty(),
            format!("no deployment listed for packages {:?}", expected),
        )
    }
}

pub struct DeleteDeployment;

#[async_trait]
impl Scenario for DeleteDeployment {
    fn name(&self) -> &'static str {
        "deployment_delete"
    }

    fn service(&self) -> Service {
        Service::DeviceManagement
    }

    async fn setup(&self, ctx: &mut ScenarioContext) -> Result<Fixture> {
        deployment_setup(ctx, 1).await
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()> {
        let request = fixtures::new_deployment(
            "test-delete-deployment",
            fixture.device_group_id()?,
            fixture.package_id()?,
        );
        let deployment = create_deployment(ctx, &request).await?;

        let services = ctx.services();
        let deployments = &services.deployments;
        deployments
            .get(&deployment.id, None)
            .await?
            .expect_status(StatusCode::OK)?;

        deployments
            .delete(&deployment.id)
            .await?
            .expect_status(StatusCode::OK)?;
        ctx.untrack(deployments, &deployment.id);

        deployments
            .get(&deployment.id, None)
            .await?
            .expect_status(StatusCode::NOT_FOUND)?;
        Ok(())
    }
}
